//! CSV file recorder: appends one line per reporting window

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::errors::RecorderError;
use crate::models::Measurement;
use crate::recorders::Recorder;

/// Appends `start,end,temp,wind,wind_ticks,rain,rain_tips` to a file,
/// opening and closing it on every call. A missing temperature is written
/// as an empty field.
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn format_line(measurement: &Measurement) -> String {
        let temp = measurement
            .temperature
            .map(|t| format!("{:.6}", t))
            .unwrap_or_default();
        format!(
            "{},{},{},{:.6},{},{:.6},{}\n",
            measurement.start_str(),
            measurement.end_str(),
            temp,
            measurement.wind_speed,
            measurement.wind_ticks,
            measurement.rain_depth,
            measurement.rain_tips,
        )
    }
}

#[async_trait]
impl Recorder for CsvRecorder {
    async fn record(&self, measurement: &Measurement) -> Result<(), RecorderError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(Self::format_line(measurement).as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitSystem;
    use time::macros::datetime;

    fn measurement(temperature: Option<f64>) -> Measurement {
        Measurement {
            start: datetime!(2024-03-05 07:00:00 UTC),
            end: datetime!(2024-03-05 07:01:00 UTC),
            duration_secs: 60,
            temperature,
            wind_speed: 4.25,
            wind_ticks: 11,
            rain_depth: 0.5588,
            rain_tips: 2,
            units: UnitSystem::Metric,
        }
    }

    #[test]
    fn line_format_matches_station_csv() {
        let line = CsvRecorder::format_line(&measurement(Some(21.5)));
        assert_eq!(
            line,
            "2024-03-05 07:00:00,2024-03-05 07:01:00,21.500000,4.250000,11,0.558800,2\n"
        );
    }

    #[test]
    fn missing_temperature_is_empty_field() {
        let line = CsvRecorder::format_line(&measurement(None));
        assert!(line.contains("07:01:00,,4.250000,"));
    }

    #[tokio::test]
    async fn appends_across_calls() {
        let path = std::env::temp_dir().join(format!("weather-csv-{}.csv", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        let recorder = CsvRecorder::new(&path);
        recorder.record(&measurement(Some(21.5))).await.unwrap();
        recorder.record(&measurement(Some(22.0))).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
