use time::{format_description, OffsetDateTime};

use crate::units::UnitSystem;

/// One completed reporting window, with values already converted into the
/// configured unit system. Produced once per window by the sampler and
/// handed read-only to every recorder.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub duration_secs: u64,
    /// `None` when no temperature sub-sample succeeded during the window.
    pub temperature: Option<f64>,
    pub wind_speed: f64,
    pub wind_ticks: u32,
    pub rain_depth: f64,
    pub rain_tips: u32,
    pub units: UnitSystem,
}

impl Measurement {
    pub fn start_str(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_str(&self) -> String {
        format_timestamp(&self.end)
    }
}

/// Format a timestamp for display and the recorder wire formats
///
/// Converts an OffsetDateTime to YYYY-MM-DD HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_timestamp(dt: &OffsetDateTime) -> String {
    let format = format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .expect("Failed to create format description");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}
