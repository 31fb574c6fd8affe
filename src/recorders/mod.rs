pub mod csv;
pub mod postgres;
pub mod rest;

use async_trait::async_trait;
use log::{error, info};

use crate::errors::RecorderError;
use crate::models::Measurement;

/// A pluggable sink that persists or transmits one completed measurement.
///
/// Implementations manage their own connections and tear them down per call;
/// the registry treats every backend as stateless between windows.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn record(&self, measurement: &Measurement) -> Result<(), RecorderError>;
}

/// Ordered collection of named recorder backends.
///
/// Populated once at startup before interrupts are armed, then read-only;
/// dispatch therefore needs no locking.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(String, Box<dyn Recorder>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend. Order of registration is the order of fan-out.
    /// Duplicate names are permitted and both entries are kept.
    pub fn register(&mut self, name: impl Into<String>, recorder: Box<dyn Recorder>) {
        self.entries.push((name.into(), recorder));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Fan a measurement out to every backend, in registration order, one
    /// after another. A failing backend is logged and skipped; it never
    /// prevents later backends from running, and nothing is surfaced to the
    /// caller.
    pub async fn dispatch(&self, measurement: &Measurement) {
        for (name, recorder) in &self.entries {
            info!("Recording to: {}", name);
            if let Err(e) = recorder.record(measurement).await {
                error!("Recorder '{}' failed: {}", name, e);
            }
        }
    }
}
