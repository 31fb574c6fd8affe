//! Shared state between the edge-callback context and the sampling loop

use std::sync::atomic::{AtomicU32, Ordering};

/// A monotonically-incrementing event counter shared with interrupt context.
///
/// Edge callbacks call `increment`; the sampling loop drains it once per
/// reporting window with `read_and_reset`. Both sides go through a single
/// atomic, so an increment racing a reset lands in either the current or the
/// next window but is never lost or double-counted.
#[derive(Debug, Default)]
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sensor edge. Safe to call from any thread; never blocks.
    pub fn increment(&self) {
        self.ticks.fetch_add(1, Ordering::Release);
    }

    /// Return the count accumulated since the previous reset and zero it.
    pub fn read_and_reset(&self) -> u32 {
        self.ticks.swap(0, Ordering::AcqRel)
    }
}

/// Running temperature average over one reporting window.
///
/// This is a decaying average, not a true mean: each new reading is folded in
/// as `(mean + reading) / 2`, so recent sub-samples dominate. The recurrence
/// matches the deployed station's output and must be kept as-is.
#[derive(Debug, Default)]
pub struct TemperatureAccumulator {
    mean: Option<f64>,
}

impl TemperatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a new reading into the running value.
    pub fn observe(&mut self, reading: f64) {
        self.mean = Some(match self.mean {
            Some(mean) => (mean + reading) / 2.0,
            None => reading,
        });
    }

    /// Return the accumulated value, or `None` if nothing was observed since
    /// the last reset, and clear back to empty.
    pub fn read_and_reset(&mut self) -> Option<f64> {
        self.mean.take()
    }
}
