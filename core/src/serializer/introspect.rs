//! serializer/introspect.rs
//!
//! Class descriptors and the serialization plans built from them.
//!
//! Design notes:
//! - A `ClassDescriptor<T>` lists the class chain of `T`, most-derived level
//!   first. Each level declares its fields in order with a typed accessor.
//! - `ClassPlan::build` drops `TRANSIENT`/`STATIC` fields, puts primitive-like
//!   fields before compound ones (stable within each group), and binds one
//!   writer per field. The result depends only on the descriptor, so every
//!   rebuild produces the same field order.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::serializer::field_writer::{str_accessor, Accessor, FieldDescriptor, FieldModifiers, FieldWriter};
use crate::types::Result;
use crate::value::{ObjectRef, UtcMillis, Value};

/// Plan construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error("class name is empty")]
    EmptyClassName,

    #[error("'{class}' declares a field with an empty name")]
    EmptyFieldName { class: String },

    #[error("'{class}' declares field '{field}' more than once")]
    DuplicateField { class: String, field: String },
}

/// Substitution hook: receives the instance and its shared handle, returns
/// the value to write in its place.
pub type WriteReplaceHook<T> = Arc<dyn Fn(&T, &ObjectRef) -> Result<Value> + Send + Sync>;

struct DeclaredField<T> {
    name: String,
    modifiers: FieldModifiers,
    accessor: Accessor<T>,
}

struct ClassLevel<T> {
    class_name: String,
    fields: Vec<DeclaredField<T>>,
}

/// Declared layout of `T`: its class chain and each level's fields.
///
/// ```ignore
/// ClassDescriptor::new("com.example.Point")
///     .int("x", |p: &Point| p.x)
///     .int("y", |p: &Point| p.y)
/// ```
pub struct ClassDescriptor<T> {
    levels: Vec<ClassLevel<T>>,
    unshared: bool,
    write_replace: Option<WriteReplaceHook<T>>,
}

impl<T: 'static> ClassDescriptor<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            levels: vec![ClassLevel { class_name: type_name.into(), fields: Vec::new() }],
            unshared: false,
            write_replace: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.levels[0].class_name
    }

    fn field(mut self, name: &str, accessor: Accessor<T>) -> Self {
        self.levels[0].fields.push(DeclaredField {
            name: name.to_string(),
            modifiers: FieldModifiers::empty(),
            accessor,
        });
        self
    }

    pub fn boolean<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.field(name, Accessor::Bool(Arc::new(f)))
    }

    pub fn byte<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> i8 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Byte(Arc::new(f)))
    }

    pub fn char<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> char + Send + Sync + 'static,
    {
        self.field(name, Accessor::Char(Arc::new(f)))
    }

    pub fn short<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> i16 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Short(Arc::new(f)))
    }

    pub fn int<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> i32 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Int(Arc::new(f)))
    }

    pub fn long<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Long(Arc::new(f)))
    }

    /// Sent widened to a double.
    pub fn float<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> f32 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Float(Arc::new(f)))
    }

    pub fn double<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.field(name, Accessor::Double(Arc::new(f)))
    }

    /// String field; `None` is sent as null.
    pub fn string<F>(self, name: &str, f: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Option<&'a str> + Send + Sync + 'static,
    {
        self.field(name, Accessor::Str(str_accessor(f)))
    }

    /// Date field of any `UtcMillis` type; `None` is sent as null.
    pub fn date<D, F>(self, name: &str, f: F) -> Self
    where
        D: UtcMillis,
        F: Fn(&T) -> Option<D> + Send + Sync + 'static,
    {
        self.field(name, Accessor::Date(Arc::new(move |t: &T| f(t).map(|d| d.utc_millis()))))
    }

    /// Any other field, written with full reference tracking.
    pub fn object<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.field(name, Accessor::Object(Arc::new(f)))
    }

    /// Set modifiers on the most recently declared field.
    pub fn modifiers(mut self, modifiers: FieldModifiers) -> Self {
        if let Some(last) = self.levels[0].fields.last_mut() {
            last.modifiers |= modifiers;
        }
        self
    }

    /// Mark the most recently declared field transient.
    pub fn transient(self) -> Self {
        self.modifiers(FieldModifiers::TRANSIENT)
    }

    /// Instances are written without back-reference sharing. A graph written
    /// this way must be acyclic.
    pub fn unshared(mut self) -> Self {
        self.unshared = true;
        self
    }

    pub fn write_replace<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &ObjectRef) -> Result<Value> + Send + Sync + 'static,
    {
        self.write_replace = Some(Arc::new(f));
        self
    }

    /// Append a parent's class chain. `project` reaches the embedded parent.
    /// A parent substitution hook applies when this type declares none.
    pub fn extends<P: 'static>(mut self, parent: ClassDescriptor<P>, project: fn(&T) -> &P) -> Self {
        for level in parent.levels {
            let fields = level
                .fields
                .into_iter()
                .map(|f| DeclaredField {
                    name: f.name,
                    modifiers: f.modifiers,
                    accessor: f.accessor.project(project),
                })
                .collect();
            self.levels.push(ClassLevel { class_name: level.class_name, fields });
        }
        if self.write_replace.is_none() {
            if let Some(hook) = parent.write_replace {
                self.write_replace = Some(Arc::new(move |t: &T, original: &ObjectRef| hook(project(t), original)));
            }
        }
        self
    }
}

/// Cached per-type write plan.
pub struct ClassPlan<T> {
    type_name: String,
    fields: Vec<FieldDescriptor>,
    field_names: Vec<String>,
    writers: Vec<FieldWriter<T>>,
    unshared: bool,
    write_replace: Option<WriteReplaceHook<T>>,
}

impl<T: 'static> ClassPlan<T> {
    pub fn build(descriptor: ClassDescriptor<T>) -> std::result::Result<Self, IntrospectionError> {
        let type_name = descriptor.levels[0].class_name.clone();
        if type_name.is_empty() {
            return Err(IntrospectionError::EmptyClassName);
        }

        let mut primitive = Vec::new();
        let mut compound = Vec::new();
        for level in descriptor.levels {
            if level.class_name.is_empty() {
                return Err(IntrospectionError::EmptyClassName);
            }
            let mut seen = HashSet::new();
            for field in level.fields {
                if field.name.is_empty() {
                    return Err(IntrospectionError::EmptyFieldName { class: level.class_name.clone() });
                }
                if !seen.insert(field.name.clone()) {
                    return Err(IntrospectionError::DuplicateField {
                        class: level.class_name.clone(),
                        field: field.name,
                    });
                }
                if field.modifiers.intersects(FieldModifiers::TRANSIENT | FieldModifiers::STATIC) {
                    continue;
                }
                let writer = FieldWriter::new(level.class_name.clone(), field.name, field.accessor);
                if writer.kind().is_primitive_like() {
                    primitive.push(writer);
                } else {
                    compound.push(writer);
                }
            }
        }

        let writers: Vec<FieldWriter<T>> = primitive.into_iter().chain(compound).collect();
        let fields = writers.iter().map(FieldWriter::descriptor).collect();
        let field_names = writers.iter().map(|w| w.name().to_string()).collect();

        Ok(Self {
            type_name,
            fields,
            field_names,
            writers,
            unshared: descriptor.unshared,
            write_replace: descriptor.write_replace,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Serialized fields in wire order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn writers(&self) -> &[FieldWriter<T>] {
        &self.writers
    }

    pub fn is_unshared(&self) -> bool {
        self.unshared
    }

    pub fn write_replace(&self) -> Option<&WriteReplaceHook<T>> {
        self.write_replace.as_ref()
    }
}
