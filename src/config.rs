use std::env;
use std::path::PathBuf;

use crate::errors::StartupError;
use crate::units::UnitSystem;

/// Default sysfs base for 1-wire device nodes.
const DEFAULT_W1_BASE: &str = "/sys/bus/w1/devices";

/// Immutable station configuration, loaded once at startup from the
/// environment (with .env support). Nothing here is runtime-mutable.
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub units: UnitSystem,
    /// Seconds between temperature sub-samples (also paces the main loop).
    pub temp_sample_secs: u64,
    /// Seconds per reporting window.
    pub window_secs: u64,
    /// Anemometer rotor radius in centimeters.
    pub wind_radius_cm: f64,
    /// Empirical anemometer drag calibration factor.
    pub wind_adjustment: f64,
    /// Rain gauge bucket size in millimeters per tip.
    pub rain_bucket_mm: f64,
    pub w1_base_path: PathBuf,
    /// BCM pin numbers for the edge-triggered sensors.
    pub wind_pin: u8,
    pub rain_pin: u8,
    /// Backends are enabled by presence of their setting.
    pub csv_path: Option<PathBuf>,
    pub http_endpoint: Option<String>,
    pub database_url: Option<String>,
    pub database_table: String,
}

impl StationConfig {
    pub fn new() -> Result<Self, StartupError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let units = match env::var("UNIT_SYSTEM") {
            Ok(raw) => raw.parse().map_err(StartupError::Config)?,
            Err(_) => UnitSystem::Metric,
        };

        let temp_sample_secs = parse_var("TEMP_SAMPLE_SECS", 5u64)?;
        let window_secs = parse_var("WINDOW_SECS", 60u64)?;
        if temp_sample_secs == 0 || window_secs == 0 {
            return Err(StartupError::Config(
                "TEMP_SAMPLE_SECS and WINDOW_SECS must be non-zero".into(),
            ));
        }

        let wind_radius_cm = parse_var("WIND_RADIUS_CM", 9.0f64)?;
        let wind_adjustment = parse_var("WIND_ADJUSTMENT", 1.18f64)?;
        let rain_bucket_mm = parse_var("RAIN_BUCKET_MM", 0.2794f64)?;

        let w1_base_path = env::var("W1_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_W1_BASE));

        let wind_pin = parse_var("WIND_PIN", 17u8)?;
        let rain_pin = parse_var("RAIN_PIN", 27u8)?;

        let csv_path = env::var("CSV_PATH").ok().map(PathBuf::from);
        let http_endpoint = env::var("HTTP_ENDPOINT").ok();
        let database_url = env::var("DATABASE_URL").ok();
        let database_table =
            env::var("DATABASE_TABLE").unwrap_or_else(|_| "weather".to_string());

        Ok(StationConfig {
            units,
            temp_sample_secs,
            window_secs,
            wind_radius_cm,
            wind_adjustment,
            rain_bucket_mm,
            w1_base_path,
            wind_pin,
            rain_pin,
            csv_path,
            http_endpoint,
            database_url,
            database_table,
        })
    }
}

/// Parse an environment variable, falling back to a default when unset.
/// A set-but-malformed value is a configuration error, not a silent default.
fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, StartupError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StartupError::Config(format!("invalid value for {}: '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
