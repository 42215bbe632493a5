//! telemetry/mod.rs
//! Per-stream counters, stage timers and immutable snapshots.
//!
//! Notes:
//! - Counters are plain fields owned by one stream; no atomics.
//! - Snapshots are detached copies, safe to ship across threads.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
