use std::io;
use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::serializer::IntrospectionError;
use crate::utils::describe_tag;

/// Wire-level protocol violations. None of these are recovered from: the
/// stream is unusable past the point of failure.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected {expected} at {}", describe_tag(*.tag))]
    UnexpectedTag { expected: &'static str, tag: u8 },

    #[error("class definition #{index} is not defined ({defined} known)")]
    UnknownClassDefinition { index: usize, defined: usize },

    #[error("type reference #{index} is not defined ({defined} known)")]
    UnknownType { index: usize, defined: usize },

    #[error("back-reference #{index} is out of range ({defined} registered)")]
    InvalidReference { index: usize, defined: usize },

    #[error("class definition #{index} for '{class}' has fields {cached:?}, instance has {found:?}")]
    SchemaMismatch {
        class: String,
        index: usize,
        cached: Vec<String>,
        found: Vec<String>,
    },

    #[error("'{class}' was defined but the stream did not switch to the cached definition")]
    UnexpectedObjectBegin { class: String },

    #[error("class definition for '{class}' declared {expected} fields but {written} were written")]
    IncompleteDefinition { class: String, expected: usize, written: usize },

    #[error("invalid string encoding: {0}")]
    InvalidString(String),

    #[error("typed map '{class}' has a non-string field name")]
    InvalidFieldName { class: String },

    #[error("nesting depth exceeds {limit}")]
    DepthExceeded { limit: usize },

    #[error("{kind} length {len} is invalid")]
    InvalidLength { kind: &'static str, len: i64 },

    #[error("{kind} value {value} does not fit")]
    ValueOutOfRange { kind: &'static str, value: i64 },
}

/// Unified error covering I/O, wire protocol, introspection and envelopes.
/// - `From<T>` impls enable `?` across every layer.
/// - Field failures nest: each object level adds its `class.field` context.
#[derive(Debug, Error)]
pub enum HessianError {
    /// I/O error from the underlying sink or source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Wire protocol violation.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Plan construction failure for a type.
    #[error("introspection error: {0}")]
    Introspection(#[from] IntrospectionError),

    /// Envelope framing failure.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Failure while writing one field of an instance.
    #[error("{class}.{field}: {source}")]
    Field {
        class: String,
        field: String,
        #[source]
        source: Box<HessianError>,
    },

    /// A serializer was handed an instance of another type.
    #[error("serializer for '{expected}' received an instance of another type")]
    Downcast { expected: String },

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Error raised by user code (substitution hooks).
    #[error("{0}")]
    Custom(String),
}

impl HessianError {
    pub fn custom(msg: impl Into<String>) -> Self {
        HessianError::Custom(msg.into())
    }

    /// Wrap `self` with the declaring class and field it was raised from.
    pub fn in_field(self, class: &str, field: &str) -> Self {
        HessianError::Field {
            class: class.to_string(),
            field: field.to_string(),
            source: Box::new(self),
        }
    }

    /// The underlying I/O error, looking through field context.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            HessianError::Io(e) => Some(e),
            HessianError::Field { source, .. } => source.io_error(),
            _ => None,
        }
    }

    /// The innermost error, looking through field context.
    pub fn root(&self) -> &HessianError {
        match self {
            HessianError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// `class.field` pairs from the outermost object down to the failure.
    pub fn field_path(&self) -> Vec<(&str, &str)> {
        let mut path = Vec::new();
        let mut cur = self;
        while let HessianError::Field { class, field, source } = cur {
            path.push((class.as_str(), field.as_str()));
            cur = source.as_ref();
        }
        path
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HessianError>;

impl From<HessianError> for std::io::Error {
    /// Used where a `Read`/`Write` impl sits on top of the codec.
    fn from(err: HessianError) -> Self {
        match err {
            HessianError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
