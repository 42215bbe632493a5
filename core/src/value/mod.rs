//! value/mod.rs
//! Dynamic object graph: scalars, containers and compound objects.

pub mod types;
pub mod date;

pub use types::*;
pub use date::*;
