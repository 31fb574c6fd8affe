//! REST recorder: POSTs one JSON object per reporting window

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::RecorderError;
use crate::models::Measurement;
use crate::recorders::Recorder;

/// JSON body for one window. Field names match the station's historical
/// wire format; a missing temperature posts as null.
#[derive(Serialize)]
struct WindowPayload {
    start: String,
    end: String,
    temp: Option<f64>,
    wind: f64,
    spins: u32,
    rain: f64,
    tips: u32,
}

impl WindowPayload {
    fn from_measurement(m: &Measurement) -> Self {
        Self {
            start: m.start_str(),
            end: m.end_str(),
            temp: m.temperature,
            wind: m.wind_speed,
            spins: m.wind_ticks,
            rain: m.rain_depth,
            tips: m.rain_tips,
        }
    }
}

/// POSTs each completed measurement to a fixed endpoint. A non-2xx
/// response is a recorder failure; the window is dropped, not retried.
pub struct RestRecorder {
    client: reqwest::Client,
    endpoint: String,
}

impl RestRecorder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Recorder for RestRecorder {
    async fn record(&self, measurement: &Measurement) -> Result<(), RecorderError> {
        self.client
            .post(&self.endpoint)
            .json(&WindowPayload::from_measurement(measurement))
            .send()
            .await?
            .error_for_status()?;
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
    fn payload_uses_historical_field_names() {
        let payload =
            serde_json::to_value(WindowPayload::from_measurement(&measurement(Some(21.5))))
                .unwrap();
        assert_eq!(payload["start"], "2024-03-05 07:00:00");
        assert_eq!(payload["end"], "2024-03-05 07:01:00");
        assert_eq!(payload["temp"], 21.5);
        assert_eq!(payload["wind"], 4.25);
        assert_eq!(payload["spins"], 11);
        assert_eq!(payload["rain"], 0.5588);
        assert_eq!(payload["tips"], 2);
    }

    #[test]
    fn missing_temperature_posts_null() {
        let payload =
            serde_json::to_value(WindowPayload::from_measurement(&measurement(None))).unwrap();
        assert!(payload["temp"].is_null());
    }
}
