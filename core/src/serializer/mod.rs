//! serializer/mod.rs
//! Per-type serialization: descriptors, plans, the plan cache and the
//! serializers that drive an `ObjectOutput`.
//!
//! Notes:
//! - A Rust type opts in by implementing `Serializable`; it then becomes a
//!   `HessianObject` and can be placed in a `Value::Object`.
//! - Plans are cached per `TypeId` in `PlanCache::global()`.

pub mod field_writer;
pub mod introspect;
pub mod plan_cache;
pub mod object;
pub mod write_replace;
pub mod generic;
pub mod deserializer;

pub use field_writer::{FieldDescriptor, FieldKind, FieldModifiers, FieldWriter};
pub use introspect::{ClassDescriptor, ClassPlan, IntrospectionError, WriteReplaceHook};
pub use plan_cache::{PlanCache, PlanCacheStats};
pub use object::ClassSerializer;
pub use write_replace::WriteReplaceSerializer;
pub use generic::GenericObjectSerializer;
pub use deserializer::IteratorDeserializer;

use std::any::Any;
use std::sync::Arc;

use crate::io::ObjectOutput;
use crate::types::Result;
use crate::value::{HessianObject, ObjectRef};

/// Writes one compound object to an output.
pub trait Serializer: Send + Sync {
    fn write_object(&self, obj: &ObjectRef, out: &mut dyn ObjectOutput) -> Result<()>;
}

/// A Rust type with a declared Hessian class layout.
///
/// ```ignore
/// struct Point { x: i32, y: i32 }
///
/// impl Serializable for Point {
///     fn describe() -> ClassDescriptor<Self> {
///         ClassDescriptor::new("Point")
///             .int("x", |p: &Point| p.x)
///             .int("y", |p: &Point| p.y)
///     }
/// }
/// ```
pub trait Serializable: Any {
    fn describe() -> ClassDescriptor<Self>
    where
        Self: Sized;
}

impl<T: Serializable> HessianObject for T {
    fn serializer(&self) -> Result<Arc<dyn Serializer>> {
        PlanCache::global().serializer_for::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
