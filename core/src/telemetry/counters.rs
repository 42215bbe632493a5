//! telemetry/counters.rs
//! Mutable counters kept by every output and input stream.
//!
//! Summary: Counts values, object instances, class definitions and
//! back-references as they cross the wire. Converted into an immutable
//! `CountersSnapshot` on demand.
use bincode::{Encode, Decode};
use std::ops::AddAssign;

/// Deterministic counters collected during serialization.
#[derive(Default, Clone, Debug, Encode, Decode, PartialEq, Eq)]
pub struct StreamCounters {
    /// Top-level and nested values passed to `write_object`.
    pub values_written: u64,
    /// Compound instances started, cached or legacy.
    pub objects_written: u64,
    /// Class definitions (`C`) emitted.
    pub definitions_written: u64,
    /// Instances written as typed maps.
    pub legacy_objects: u64,
    /// Back-references (`Q`) emitted.
    pub refs_written: u64,
    /// Compound instances rebuilt by the reader.
    pub objects_read: u64,
    /// Class definitions consumed by the reader.
    pub definitions_read: u64,
    /// Back-references resolved by the reader.
    pub refs_read: u64,
}

impl StreamCounters {
    /// Fraction of written instances that reused a cached definition.
    pub fn definition_reuse(&self) -> f64 {
        let cached = self.objects_written.saturating_sub(self.definitions_written + self.legacy_objects);
        if self.objects_written == 0 {
            0.0
        } else {
            cached as f64 / self.objects_written as f64
        }
    }

    pub fn merge(&mut self, other: &StreamCounters) {
        self.values_written += other.values_written;
        self.objects_written += other.objects_written;
        self.definitions_written += other.definitions_written;
        self.legacy_objects += other.legacy_objects;
        self.refs_written += other.refs_written;
        self.objects_read += other.objects_read;
        self.definitions_read += other.definitions_read;
        self.refs_read += other.refs_read;
    }

    /// Compact binary form, e.g. for shipping counters between processes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        bincode::encode_to_vec(self, bincode::config::standard())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        let (counters, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(counters)
    }
}

impl AddAssign for StreamCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
