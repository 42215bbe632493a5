//! codec/mod.rs
//! Primitive wire encoders and decoders.
//!
//! Notes:
//! - Big-endian across all multi-byte integers.
//! - Stateless: reference, class and type tables live on the streams.

pub mod encode;
pub mod decode;

pub use encode::*;
pub use decode::*;
