//! The two-timescale sampling loop and per-window reporting

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::time::{sleep, Duration};

use crate::config::StationConfig;
use crate::counters::{TemperatureAccumulator, TickCounter};
use crate::models::{format_timestamp, Measurement};
use crate::recorders::Registry;
use crate::sensor;
use crate::units::{self, UnitSystem};

/// Drives the station: temperature sub-samples every `temp_sample_secs`,
/// one aggregated report every `window_secs`. Runs until the process exits.
pub struct Sampler {
    config: StationConfig,
    sensor_path: PathBuf,
    wind: Arc<TickCounter>,
    rain: Arc<TickCounter>,
    accumulator: TemperatureAccumulator,
    registry: Registry,
}

impl Sampler {
    pub fn new(
        config: StationConfig,
        sensor_path: PathBuf,
        wind: Arc<TickCounter>,
        rain: Arc<TickCounter>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            sensor_path,
            wind,
            rain,
            accumulator: TemperatureAccumulator::new(),
            registry,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Starting sampling loop: {}s sub-samples, {}s windows, {} units",
            self.config.temp_sample_secs, self.config.window_secs, self.config.units
        );

        let mut window_start = OffsetDateTime::now_utc();
        let mut next_window =
            window_start + TimeDuration::seconds(self.config.window_secs as i64);

        loop {
            match sensor::read(&self.sensor_path).await {
                Ok(reading) => self.accumulator.observe(reading),
                Err(e) => warn!("Temperature read failed, skipping sub-sample: {}", e),
            }

            sleep(Duration::from_secs(self.config.temp_sample_secs)).await;

            let now = OffsetDateTime::now_utc();
            if let Some((new_start, new_next)) =
                window_boundary(now, next_window, self.config.window_secs)
            {
                self.report(window_start, now).await;
                window_start = new_start;
                next_window = new_next;
            }
        }
    }

    /// Freeze the window's aggregates, convert, display and fan out.
    async fn report(&mut self, start: OffsetDateTime, end: OffsetDateTime) {
        let duration_secs = (end - start).whole_seconds();
        if duration_secs <= 0 {
            // Clock went backwards or the window collapsed to nothing.
            // Leave the counters accumulating into the next window rather
            // than dividing by zero.
            warn!(
                "Degenerate window ({}s) from {} to {}, skipping report",
                duration_secs,
                format_timestamp(&start),
                format_timestamp(&end)
            );
            return;
        }

        let wind_ticks = self.wind.read_and_reset();
        let rain_tips = self.rain.read_and_reset();
        let temperature_c = self.accumulator.read_and_reset();

        let measurement = build_measurement(
            &self.config,
            start,
            end,
            duration_secs as u64,
            temperature_c,
            wind_ticks,
            rain_tips,
        );

        display_report(&measurement);
        self.registry.dispatch(&measurement).await;
    }
}

/// Decide whether the slow window boundary has been reached or passed.
///
/// Returns the new `(window_start, next_window)` pair when a report is due.
/// The boundary advances by exactly one window length from its previous
/// value, never from `now`, so a late wakeup cannot accumulate drift.
fn window_boundary(
    now: OffsetDateTime,
    next_window: OffsetDateTime,
    window_secs: u64,
) -> Option<(OffsetDateTime, OffsetDateTime)> {
    if now >= next_window {
        Some((now, next_window + TimeDuration::seconds(window_secs as i64)))
    } else {
        None
    }
}

/// Convert one window's raw aggregates into a `Measurement` in the
/// configured unit system.
pub fn build_measurement(
    config: &StationConfig,
    start: OffsetDateTime,
    end: OffsetDateTime,
    duration_secs: u64,
    temperature_c: Option<f64>,
    wind_ticks: u32,
    rain_tips: u32,
) -> Measurement {
    let distance_km = units::wind_distance_km(wind_ticks, config.wind_radius_cm);
    let wind_kph = units::wind_speed_kph(distance_km, duration_secs, config.wind_adjustment);
    let rain_mm = units::rain_depth_mm(rain_tips, config.rain_bucket_mm);

    let (temperature, wind_speed, rain_depth) = match config.units {
        UnitSystem::Metric => (temperature_c, wind_kph, rain_mm),
        UnitSystem::Imperial => (
            temperature_c.map(units::c_to_f),
            units::kph_to_mph(wind_kph),
            units::mm_to_inches(rain_mm),
        ),
    };

    Measurement {
        start,
        end,
        duration_secs,
        temperature,
        wind_speed,
        wind_ticks,
        rain_depth,
        rain_tips,
        units: config.units,
    }
}

/// One human-readable report per window.
fn display_report(m: &Measurement) {
    let temp = m
        .temperature
        .map(|t| format!("{:.2}", t))
        .unwrap_or_else(|| "--".to_string());

    info!("Weather measurements:");
    info!("     Start: {}", m.start_str());
    info!("       End: {}", m.end_str());
    info!("  Duration: {} seconds", m.duration_secs);
    info!("      Temp: {} {}", temp, m.units.temperature_label());
    info!(
        "      Wind: {:.2} {} ({} ticks)",
        m.wind_speed,
        m.units.speed_label(),
        m.wind_ticks
    );
    info!(
        "      Rain: {:.2} {} ({} tips)",
        m.rain_depth,
        m.units.depth_label(),
        m.rain_tips
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn config(units: UnitSystem) -> StationConfig {
        StationConfig {
            units,
            temp_sample_secs: 5,
            window_secs: 60,
            wind_radius_cm: 9.0,
            wind_adjustment: 1.18,
            rain_bucket_mm: 0.2794,
            w1_base_path: "/sys/bus/w1/devices".into(),
            wind_pin: 17,
            rain_pin: 27,
            csv_path: None,
            http_endpoint: None,
            database_url: None,
            database_table: "weather".into(),
        }
    }

    const START: OffsetDateTime = datetime!(2024-03-05 07:00:00 UTC);
    const END: OffsetDateTime = datetime!(2024-03-05 07:01:00 UTC);

    #[test]
    fn metric_measurement_matches_formulas() {
        let m = build_measurement(&config(UnitSystem::Metric), START, END, 60, Some(21.5), 120, 5);

        let distance = f64::from(120 / 2) * (2.0 * std::f64::consts::PI * 9.0) / 100_000.0;
        let expected_wind = distance / 60.0 * 3600.0 * 1.18;

        assert_eq!(m.temperature, Some(21.5));
        assert!((m.wind_speed - expected_wind).abs() < 1e-9);
        assert!((m.rain_depth - 1.397).abs() < 1e-9);
        assert_eq!(m.wind_ticks, 120);
        assert_eq!(m.rain_tips, 5);
    }

    #[test]
    fn imperial_measurement_converts_all_fields() {
        let metric = build_measurement(&config(UnitSystem::Metric), START, END, 60, Some(0.0), 121, 5);
        let imperial =
            build_measurement(&config(UnitSystem::Imperial), START, END, 60, Some(0.0), 121, 5);

        assert_eq!(imperial.temperature, Some(32.0));
        assert!((imperial.wind_speed - metric.wind_speed * 0.62137119).abs() < 1e-9);
        assert!((imperial.rain_depth - 0.055).abs() < 1e-6);
        // Raw tick counts pass through unconverted.
        assert_eq!(imperial.wind_ticks, 121);
        assert_eq!(imperial.rain_tips, 5);
    }

    #[test]
    fn odd_tick_is_truncated_in_wind_speed() {
        let even = build_measurement(&config(UnitSystem::Metric), START, END, 60, None, 120, 0);
        let odd = build_measurement(&config(UnitSystem::Metric), START, END, 60, None, 121, 0);
        assert_eq!(even.wind_speed, odd.wind_speed);
    }

    #[test]
    fn late_wakeup_advances_boundary_by_one_window() {
        let next = START + TimeDuration::seconds(60);
        // Woken up 90 seconds past the boundary.
        let late = START + TimeDuration::seconds(150);

        let (new_start, new_next) = window_boundary(late, next, 60).unwrap();
        assert_eq!(new_start, late);
        // One window past the old boundary, not `late + 60`.
        assert_eq!(new_next, next + TimeDuration::seconds(60));
    }

    #[test]
    fn boundary_fires_at_or_after_the_deadline_only() {
        let next = START + TimeDuration::seconds(60);
        assert!(window_boundary(START + TimeDuration::seconds(59), next, 60).is_none());
        assert!(window_boundary(next, next, 60).is_some());
    }

    #[test]
    fn missing_temperature_propagates_as_none() {
        let m = build_measurement(&config(UnitSystem::Imperial), START, END, 60, None, 0, 0);
        assert_eq!(m.temperature, None);
        assert_eq!(m.wind_speed, 0.0);
    }

    #[tokio::test]
    async fn zero_duration_window_is_skipped_and_counters_kept() {
        let wind = Arc::new(TickCounter::new());
        let rain = Arc::new(TickCounter::new());
        for _ in 0..3 {
            wind.increment();
        }
        rain.increment();

        let mut sampler = Sampler::new(
            config(UnitSystem::Metric),
            "/nonexistent".into(),
            Arc::clone(&wind),
            Arc::clone(&rain),
            Registry::new(),
        );

        // start == end: must not divide by zero, must not drain the counters
        sampler.report(START, START).await;
        assert_eq!(wind.read_and_reset(), 3);
        assert_eq!(rain.read_and_reset(), 1);
    }

    #[tokio::test]
    async fn report_drains_counters_and_accumulator() {
        let wind = Arc::new(TickCounter::new());
        let rain = Arc::new(TickCounter::new());
        wind.increment();
        wind.increment();

        let mut sampler = Sampler::new(
            config(UnitSystem::Metric),
            "/nonexistent".into(),
            Arc::clone(&wind),
            Arc::clone(&rain),
            Registry::new(),
        );
        sampler.accumulator.observe(18.0);

        sampler.report(START, END).await;
        assert_eq!(wind.read_and_reset(), 0);
        assert_eq!(sampler.accumulator.read_and_reset(), None);
    }
}
