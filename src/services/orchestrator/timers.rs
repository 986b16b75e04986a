//! Stage timings reported in the metrics document.

use std::collections::BTreeMap;
use std::time::Instant;

/// Wall-clock seconds per named stage. Re-recording a stage overwrites it.
#[derive(Debug, Clone, Default)]
pub struct StageTimer {
    timings: BTreeMap<String, f64>,
}

impl StageTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the time elapsed since `started` under `stage`.
    pub fn record(&mut self, stage: impl Into<String>, started: Instant) {
        self.timings
            .insert(stage.into(), started.elapsed().as_secs_f64());
    }

    /// Run a synchronous stage and record its duration.
    pub fn measure<T>(&mut self, stage: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let value = f();
        self.record(stage, started);
        value
    }

    pub fn get(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).copied()
    }

    pub fn summary(&self) -> BTreeMap<String, f64> {
        self.timings.clone()
    }
}
