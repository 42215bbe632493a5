//! envelope/mod.rs
//! Envelopes: transformations that frame a nested, independently complete
//! Hessian stream inside an `E method ... Z` frame.

pub mod deflation;

pub use deflation::*;

use thiserror::Error;

use crate::io::{Hessian2Input, Hessian2Output, StreamSink, StreamSource};
use crate::types::{HessianError, Result};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("expected envelope '{expected}', found '{found}'")]
    MethodMismatch { expected: String, found: String },

    #[error("envelope carries {count} headers, expected none")]
    UnexpectedHeaders { count: i32 },

    #[error("envelope carries {count} footers, expected none")]
    UnexpectedFooters { count: i32 },

    #[error("envelope stream is already closed")]
    Closed,

    /// A previous `close` failed for a non-envelope reason; later closes
    /// report it again.
    #[error("envelope close failed: {0}")]
    CloseFailed(String),
}

impl EnvelopeError {
    /// The error a failed close leaves behind for later calls.
    pub(crate) fn remembered(err: &HessianError) -> Self {
        match err {
            HessianError::Envelope(e) => e.clone(),
            other => EnvelopeError::CloseFailed(other.to_string()),
        }
    }
}

/// A named envelope transformation.
pub trait Envelope {
    /// Byte sink for the nested stream; `close` finishes the frame.
    type Writer<W: StreamSink>: StreamSink;
    /// Byte source for the nested stream; `close` checks the frame trailer.
    type Reader<R: StreamSource>: StreamSource;

    /// Method name written into the frame.
    fn name(&self) -> &str;

    /// Start a frame on `out` and return the sink for the nested stream.
    fn wrap<W: StreamSink>(&self, out: Hessian2Output<W>) -> Result<Self::Writer<W>>;

    /// Read the frame header (name must match) and return the nested source.
    fn unwrap<R: StreamSource>(&self, input: Hessian2Input<R>) -> Result<Self::Reader<R>>;

    /// As `unwrap`, when the caller already consumed `E method`.
    fn unwrap_headers<R: StreamSource>(&self, input: Hessian2Input<R>) -> Result<Self::Reader<R>>;
}
