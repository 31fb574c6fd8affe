//! Error taxonomy for the station

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup failures. Each cause maps to a distinct process exit code
/// in main so supervisors can tell them apart.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to arm wind sensor interrupt: {0}")]
    WindInterrupt(#[source] std::io::Error),

    #[error("failed to arm rain sensor interrupt: {0}")]
    RainInterrupt(#[source] std::io::Error),

    #[error("unable to find temperature sensor under {base}")]
    SensorNotFound { base: PathBuf },

    #[error("failed to scan {base} for temperature sensors: {source}")]
    SensorScan {
        base: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// Process exit code for this failure cause.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => 1,
            StartupError::WindInterrupt(_) => 2,
            StartupError::RainInterrupt(_) => 3,
            StartupError::SensorNotFound { .. } | StartupError::SensorScan { .. } => 4,
        }
    }
}

/// Transient failure reading the temperature probe. The sampler logs these
/// and skips the sub-sample; the loop keeps running.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read sensor device: {0}")]
    Io(#[from] std::io::Error),

    #[error("sensor reported an invalid CRC")]
    CrcInvalid,

    #[error("sensor report did not contain a temperature value")]
    Malformed,
}

/// Failure inside a single recorder backend. Isolated per backend by the
/// registry; never propagated past dispatch.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("invalid backend configuration: {0}")]
    Config(String),
}
