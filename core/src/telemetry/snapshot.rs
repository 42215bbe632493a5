//! telemetry/snapshot.rs
//!
//! Immutable view of a stream's counters and timings.
//!
//! Design notes:
//! - Serializable with `serde` so hosts can log or export it as JSON.
//! - Rates are derived once at snapshot time.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::telemetry::counters::StreamCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub values_written: u64,
    pub objects_written: u64,
    pub definitions_written: u64,
    pub legacy_objects: u64,
    pub refs_written: u64,
    pub objects_read: u64,
    pub definitions_read: u64,
    pub refs_read: u64,
    /// Share of written instances that reused a cached definition.
    pub definition_reuse: f64,
    pub values_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl CountersSnapshot {
    pub fn from(counters: &StreamCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let values = counters.values_written + counters.objects_read;
        let values_per_sec = if elapsed.as_secs_f64() > 0.0 {
            values as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            values_written: counters.values_written,
            objects_written: counters.objects_written,
            definitions_written: counters.definitions_written,
            legacy_objects: counters.legacy_objects,
            refs_written: counters.refs_written,
            objects_read: counters.objects_read,
            definitions_read: counters.definitions_read,
            refs_read: counters.refs_read,
            definition_reuse: counters.definition_reuse(),
            values_per_sec,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    /// Definitions and legacy writes are subsets of object writes, and
    /// stage time never exceeds wall time.
    pub fn sanity_check(&self) -> bool {
        self.definitions_written + self.legacy_objects <= self.objects_written
            && self.total_stage_time() <= self.elapsed
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
