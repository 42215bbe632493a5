//! telemetry/timers.rs
//! Wall-clock accounting for the four places a stream spends time:
//! top-level writes, top-level reads, and the envelope's deflate and
//! inflate passes.

use std::fmt;
use std::time::{Duration, Instant};
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    /// Top-level `write_object` calls.
    Write = 0,
    /// Top-level `read_object` calls.
    Read = 1,
    /// Bytes pushed through the envelope deflater.
    Deflate = 2,
    /// Bytes pulled through the envelope inflater.
    Inflate = 3,
}

const STAGE_COUNT: usize = 4;

impl Stage {
    pub const ALL: [Stage; STAGE_COUNT] = [Stage::Write, Stage::Read, Stage::Deflate, Stage::Inflate];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Write => "write",
            Stage::Read => "read",
            Stage::Deflate => "deflate",
            Stage::Inflate => "inflate",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated time per stage; one fixed slot each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimes {
    slots: [Duration; STAGE_COUNT],
}

impl StageTimes {
    pub fn add(&mut self, stage: Stage, dur: Duration) {
        self.slots[stage.slot()] += dur;
    }

    pub fn get(&self, stage: Stage) -> Duration {
        self.slots[stage.slot()]
    }

    pub fn get_us(&self, stage: Stage) -> f64 {
        self.get(stage).as_secs_f64() * 1_000_000.0
    }

    pub fn total(&self) -> Duration {
        self.slots.iter().sum()
    }

    /// Stages that recorded any time, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        Stage::ALL
            .into_iter()
            .map(|stage| (stage, self.get(stage)))
            .filter(|(_, dur)| !dur.is_zero())
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    started: Instant,
    stopped: Option<Instant>,
    pub stage_times: StageTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stopped: None,
            stage_times: StageTimes::default(),
        }
    }

    /// Freeze `elapsed()`. Later calls keep the first stop time.
    pub fn finish(&mut self) {
        self.stopped.get_or_insert_with(Instant::now);
    }

    pub fn add_stage_time(&mut self, stage: Stage, dur: Duration) {
        self.stage_times.add(stage, dur);
    }

    /// Run `f` and charge its wall time to `stage`.
    pub fn measure<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.add_stage_time(stage, started.elapsed());
        out
    }

    pub fn elapsed(&self) -> Duration {
        self.stopped.unwrap_or_else(Instant::now).duration_since(self.started)
    }
}
