//! serializer/object.rs
//!
//! Object serializer: reference registration, schema negotiation and the
//! field-writer plan.
//!
//! Protocol per instance:
//! 1. `add_ref`: a known instance becomes a back-reference and we stop.
//! 2. `write_object_begin`:
//!    - `Cached(i)`: check that schema `i` is our field list, write values.
//!    - `NewDefinition`: write field count and names, begin again (which
//!      must yield `Cached`), write values.
//!    - `Legacy`: write `(name, value)` pairs, then the map end marker.

use std::sync::Arc;

use crate::io::{ObjectBegin, ObjectOutput};
use crate::serializer::introspect::ClassPlan;
use crate::serializer::{Serializable, Serializer};
use crate::types::{HessianError, ProtocolError, Result};
use crate::value::{ObjectRef, Value};

/// Serializer for a `Serializable` type, driven by its cached plan.
pub struct ClassSerializer<T> {
    plan: Arc<ClassPlan<T>>,
}

impl<T: Serializable> ClassSerializer<T> {
    pub fn new(plan: Arc<ClassPlan<T>>) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &Arc<ClassPlan<T>> {
        &self.plan
    }

    fn write_shared(&self, value: &Value, this: &T, out: &mut dyn ObjectOutput) -> Result<()> {
        if out.add_ref(value)? {
            return Ok(());
        }
        let writers = self.plan.writers();
        write_instance(out, self.plan.type_name(), self.plan.field_names(), |i, out| {
            writers[i].write(this, out)
        })
    }
}

impl<T: Serializable> Serializer for ClassSerializer<T> {
    fn write_object(&self, obj: &ObjectRef, out: &mut dyn ObjectOutput) -> Result<()> {
        let this = obj.as_any().downcast_ref::<T>().ok_or_else(|| HessianError::Downcast {
            expected: self.plan.type_name().to_string(),
        })?;
        let value = Value::Object(obj.clone());

        if !self.plan.is_unshared() {
            return self.write_shared(&value, this, out);
        }
        let previous = out.set_unshared(true);
        let result = self.write_shared(&value, this, out);
        out.set_unshared(previous);
        result
    }
}

/// Shared three-way instance protocol. `write_field(i, out)` writes the
/// value of field `i` of `names`.
pub(crate) fn write_instance<F>(
    out: &mut dyn ObjectOutput,
    type_name: &str,
    names: &[String],
    mut write_field: F,
) -> Result<()>
where
    F: FnMut(usize, &mut dyn ObjectOutput) -> Result<()>,
{
    match out.write_object_begin(type_name)? {
        ObjectBegin::Legacy => {
            for (i, name) in names.iter().enumerate() {
                out.write_string(name)?;
                write_field(i, &mut *out)?;
            }
            out.write_map_end()
        }
        ObjectBegin::NewDefinition => {
            out.write_class_field_length(names.len())?;
            for name in names {
                out.write_string(name)?;
            }
            match out.write_object_begin(type_name)? {
                ObjectBegin::Cached(index) => write_values(out, type_name, index, names, write_field),
                _ => Err(ProtocolError::UnexpectedObjectBegin { class: type_name.to_string() }.into()),
            }
        }
        ObjectBegin::Cached(index) => write_values(out, type_name, index, names, write_field),
    }
}

fn write_values<F>(
    out: &mut dyn ObjectOutput,
    type_name: &str,
    index: usize,
    names: &[String],
    mut write_field: F,
) -> Result<()>
where
    F: FnMut(usize, &mut dyn ObjectOutput) -> Result<()>,
{
    match out.class_schema(index) {
        Some(schema) if schema.field_names.as_slice() == names => {}
        Some(schema) => {
            return Err(ProtocolError::SchemaMismatch {
                class: type_name.to_string(),
                index,
                cached: schema.field_names.clone(),
                found: names.to_vec(),
            }
            .into())
        }
        None => return Err(ProtocolError::UnknownClassDefinition { index, defined: index }.into()),
    }
    for i in 0..names.len() {
        write_field(i, &mut *out)?;
    }
    Ok(())
}
