//! config.rs
//! Stream and envelope configuration.
//!
//! All configs are plain data with `Default`, and load from JSON so a host
//! process can keep them next to its own settings.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH};
use crate::types::Result;

/// How compound objects are framed on an output stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Hessian 2: class definitions sent once, instances carry values only.
    #[default]
    Cached,
    /// Protocol version 1 peers: every instance is a typed map of
    /// `(field name, value)` pairs closed by an end marker.
    Legacy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub schema_mode: SchemaMode,
    /// Close the byte sink when the output is closed.
    pub close_stream_on_close: bool,
    pub buffer_size: usize,
    /// Maximum nesting accepted by `write_object`.
    pub max_depth: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            schema_mode: SchemaMode::Cached,
            close_stream_on_close: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl OutputConfig {
    pub fn legacy() -> Self {
        Self { schema_mode: SchemaMode::Legacy, ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Close the byte source when the input is closed.
    pub close_stream_on_close: bool,
    pub buffer_size: usize,
    /// Maximum container nesting accepted by `read_object`.
    pub max_depth: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            close_stream_on_close: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl InputConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Deflation envelope settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeflationConfig {
    /// zlib level 0..=9; out-of-range values fall back to the default level.
    pub level: u32,
}

impl Default for DeflationConfig {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
