//! io/mod.rs
//! Hessian 2.0 streams: the object output/input surfaces, their per-stream
//! tables, binary body streams and closable byte sources and sinks.

pub mod stream;
pub mod tables;
pub mod output;
pub mod input;
pub mod body;

pub use stream::*;
pub use tables::*;
pub use output::*;
pub use input::*;
pub use body::*;
