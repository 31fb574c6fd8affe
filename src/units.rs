//! Conversions from raw tick counts and accumulated readings into
//! physical units

use std::fmt;
use std::str::FromStr;

/// Centimeters per kilometer.
const CM_IN_KM: f64 = 100_000.0;
/// Seconds per hour.
const SECONDS_IN_HOUR: f64 = 3600.0;

const KPH_PER_MPH: f64 = 0.62137119;
const INCHES_PER_MM: f64 = 0.03937007874;

/// Unit system the station reports in, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn temperature_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "c",
            UnitSystem::Imperial => "f",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "kph",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn depth_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "mm",
            UnitSystem::Imperial => "inches",
        }
    }
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(format!("unknown unit system '{}'", other)),
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSystem::Metric => write!(f, "metric"),
            UnitSystem::Imperial => write!(f, "imperial"),
        }
    }
}

/// Distance covered by the anemometer cups in kilometers.
///
/// The sensor emits two edges per full rotation, so ticks are halved with
/// integer division first; an unpaired odd tick is deliberately truncated.
pub fn wind_distance_km(ticks: u32, radius_cm: f64) -> f64 {
    let circumference_cm = 2.0 * std::f64::consts::PI * radius_cm;
    f64::from(ticks / 2) * circumference_cm / CM_IN_KM
}

/// Wind speed in km/h over a window of `duration_secs` seconds.
///
/// `adjustment` is the anemometer's empirical drag calibration factor.
/// Callers must guard against a zero-length window.
pub fn wind_speed_kph(distance_km: f64, duration_secs: u64, adjustment: f64) -> f64 {
    distance_km / duration_secs as f64 * SECONDS_IN_HOUR * adjustment
}

/// Rain depth in millimeters from bucket tip count.
pub fn rain_depth_mm(tips: u32, bucket_mm: f64) -> f64 {
    f64::from(tips) * bucket_mm
}

pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn kph_to_mph(kph: f64) -> f64 {
    kph * KPH_PER_MPH
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm * INCHES_PER_MM
}
