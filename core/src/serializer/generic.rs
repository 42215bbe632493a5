//! serializer/generic.rs
//! Serializer for `GenericObject`, the dynamic rendering of class instances.
//!
//! Uses the same instance protocol as typed classes, with the field list
//! taken from the object itself, so a decoded graph can be written back out.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use crate::io::ObjectOutput;
use crate::serializer::object::write_instance;
use crate::serializer::Serializer;
use crate::types::{HessianError, Result};
use crate::value::{GenericObject, HessianObject, ObjectRef, Value};

pub struct GenericObjectSerializer;

impl GenericObjectSerializer {
    /// Shared stateless instance.
    pub fn shared() -> Arc<dyn Serializer> {
        static SHARED: OnceLock<Arc<dyn Serializer>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(GenericObjectSerializer)).clone()
    }
}

impl Serializer for GenericObjectSerializer {
    fn write_object(&self, obj: &ObjectRef, out: &mut dyn ObjectOutput) -> Result<()> {
        let this = obj
            .as_any()
            .downcast_ref::<GenericObject>()
            .ok_or_else(|| HessianError::Downcast { expected: "GenericObject".to_string() })?;
        if out.add_ref(&Value::Object(obj.clone()))? {
            return Ok(());
        }

        // Snapshot the fields: a nested write may reach this object again.
        let fields: Vec<(String, Value)> = this.fields().clone();
        let names: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();
        let class = this.type_name();

        write_instance(out, class, &names, |i, out| {
            let (name, value) = &fields[i];
            out.write_object(value).map_err(|e| e.in_field(class, name))
        })
    }
}

impl HessianObject for GenericObject {
    fn serializer(&self) -> Result<Arc<dyn Serializer>> {
        Ok(GenericObjectSerializer::shared())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
