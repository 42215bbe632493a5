//! serializer/write_replace.rs
//! Substitution in front of a base serializer.
//!
//! The replacement is written in place of the original and then takes over
//! the original's identity, so later occurrences of the original become
//! back-references to the replacement and the hook runs once per instance.

use std::sync::Arc;
use tracing::debug;

use crate::io::ObjectOutput;
use crate::serializer::introspect::WriteReplaceHook;
use crate::serializer::{Serializable, Serializer};
use crate::types::{HessianError, Result};
use crate::value::{ObjectRef, Value};

pub struct WriteReplaceSerializer<T> {
    type_name: String,
    base: Arc<dyn Serializer>,
    hook: WriteReplaceHook<T>,
}

impl<T: Serializable> WriteReplaceSerializer<T> {
    pub fn new(type_name: impl Into<String>, base: Arc<dyn Serializer>, hook: WriteReplaceHook<T>) -> Self {
        Self { type_name: type_name.into(), base, hook }
    }
}

impl<T: Serializable> Serializer for WriteReplaceSerializer<T> {
    fn write_object(&self, obj: &ObjectRef, out: &mut dyn ObjectOutput) -> Result<()> {
        let original = Value::Object(obj.clone());
        if let Some(index) = out.get_ref(&original) {
            return out.write_ref(index);
        }

        let this = obj
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| HessianError::Downcast { expected: self.type_name.clone() })?;
        let replacement = (self.hook)(this, obj)?;

        if replacement.ptr_eq(&original) {
            debug!(class = %self.type_name, "write_replace returned the original instance");
            return self.base.write_object(obj, out);
        }

        out.write_object(&replacement)?;
        out.replace_ref(&replacement, &original);
        Ok(())
    }
}
