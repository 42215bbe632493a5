//! hessian-core
//!
//! Hessian 2.0 object-graph serialization engine.
//! Pure Rust: compact scalar encodings, shared references, cached class
//! definitions and the Deflation envelope.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod config;
pub mod utils;

// Object model and wire codec
pub mod value;
pub mod codec;

// Streams and per-type serialization
pub mod io;
pub mod serializer;

// Envelopes and observability
pub mod envelope;
pub mod telemetry;

use crate::envelope::{Deflation, Envelope};
use crate::io::{Hessian2Input, Hessian2Output, ObjectInput, ObjectOutput};
use crate::types::Result;
use crate::value::Value;

/// Serialize one value graph into a fresh buffer.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut out = Hessian2Output::new(Vec::new());
    out.write_object(value)?;
    Ok(out.into_inner()?)
}

/// Read one value graph from `bytes`.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    Hessian2Input::new(bytes).read_object()
}

/// Serialize one value graph inside a Deflation envelope.
pub fn to_deflated_bytes(value: &Value) -> Result<Vec<u8>> {
    let outer = Hessian2Output::new(Vec::new());
    let body = Deflation::new().wrap(outer)?;
    let mut inner = Hessian2Output::new(body);
    inner.write_object(value)?;
    let outer = inner.into_inner()?.finish()?;
    Ok(outer.into_inner()?)
}

/// Read one value graph from a Deflation envelope.
pub fn from_deflated_bytes(bytes: &[u8]) -> Result<Value> {
    let body = Deflation::new().unwrap(Hessian2Input::new(bytes))?;
    let mut inner = Hessian2Input::new(body);
    let value = inner.read_object()?;
    inner.into_inner().finish()?;
    Ok(value)
}

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::{DeflationConfig, InputConfig, OutputConfig, SchemaMode};
    pub use crate::envelope::{Deflation, Envelope, EnvelopeError};
    pub use crate::io::{Hessian2Input, Hessian2Output, ObjectBegin, ObjectInput, ObjectOutput};
    pub use crate::serializer::{ClassDescriptor, FieldModifiers, PlanCache, Serializable, Serializer};
    pub use crate::types::{HessianError, ProtocolError, Result};
    pub use crate::value::{GenericObject, HessianObject, ListValue, MapValue, ObjectRef, Value};
    pub use crate::{from_bytes, from_deflated_bytes, to_bytes, to_deflated_bytes};
}
