//! PostgreSQL recorder: one parameterized INSERT per reporting window

use async_trait::async_trait;
use log::error;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::{Client, NoTls};
use url::Url;

use crate::errors::RecorderError;
use crate::models::Measurement;
use crate::recorders::Recorder;

/// Inserts the measurement fields into a configured table, opening a fresh
/// connection per call and tearing it down afterwards. A failed insert is
/// reported to the registry and the window is dropped; there is no retry.
///
/// TLS follows the `sslrootcert` query-parameter convention: when present in
/// the connection URL it names a CA bundle and the parameter is stripped
/// before the URL is handed to the driver; when absent the connection is
/// plain TCP.
pub struct PostgresRecorder {
    database_url: String,
    table: String,
}

impl PostgresRecorder {
    pub fn new(database_url: impl Into<String>, table: impl Into<String>) -> Result<Self, RecorderError> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(RecorderError::Config(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(Self {
            database_url: database_url.into(),
            table,
        })
    }

    async fn insert(&self, client: &Client, m: &Measurement) -> Result<(), RecorderError> {
        let statement = format!(
            "INSERT INTO {}(start_time, end_time, duration_secs, temperature, \
             wind_speed, wind_ticks, rain_depth, rain_tips) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            self.table
        );
        client
            .execute(
                &statement,
                &[
                    &m.start,
                    &m.end,
                    &(m.duration_secs as i64),
                    &m.temperature,
                    &m.wind_speed,
                    &(m.wind_ticks as i32),
                    &m.rain_depth,
                    &(m.rain_tips as i32),
                ],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Recorder for PostgresRecorder {
    async fn record(&self, measurement: &Measurement) -> Result<(), RecorderError> {
        match split_sslrootcert(&self.database_url) {
            Some((clean_url, ca_path)) => {
                let connector = create_ssl_connector(&ca_path)?;
                let (client, connection) = tokio_postgres::connect(&clean_url, connector).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("Connection error: {}", e);
                    }
                });
                self.insert(&client, measurement).await
            }
            None => {
                let (client, connection) =
                    tokio_postgres::connect(&self.database_url, NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("Connection error: {}", e);
                    }
                });
                self.insert(&client, measurement).await
            }
        }
    }
}

fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, RecorderError> {
    let mut builder = SslConnector::builder(SslMethod::tls())
        .map_err(|e| RecorderError::Tls(format!("SSL builder error: {}", e)))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| RecorderError::Tls(format!("Error loading CA cert: {}", e)))?;

    builder.set_verify(SslVerifyMode::NONE); // TEMPORARY FOR SELF-SIGNED CERTS

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Pull the `sslrootcert` query parameter out of a connection URL, returning
/// the cleaned URL and the CA path. `None` when the parameter is absent or
/// the URL does not parse (the driver will report its own error).
fn split_sslrootcert(database_url: &str) -> Option<(String, String)> {
    let url = Url::parse(database_url).ok()?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }
    let sslrootcert_path = sslrootcert_path?;

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Some((clean_url.to_string(), sslrootcert_path))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sslrootcert_and_keeps_other_params() {
        let (clean, ca) = split_sslrootcert(
            "postgres://user:pw@db.example.com:5432/weather?sslmode=require&sslrootcert=/etc/ca.pem",
        )
        .unwrap();
        assert_eq!(ca, "/etc/ca.pem");
        assert_eq!(
            clean,
            "postgres://user:pw@db.example.com:5432/weather?sslmode=require"
        );
    }

    #[test]
    fn url_without_sslrootcert_uses_plain_connection() {
        assert!(split_sslrootcert("postgres://localhost/weather").is_none());
    }

    #[test]
    fn rejects_injectable_table_names() {
        assert!(PostgresRecorder::new("postgres://localhost/weather", "weather").is_ok());
        assert!(PostgresRecorder::new("postgres://localhost/weather", "weather_2024").is_ok());
        assert!(PostgresRecorder::new("postgres://localhost/weather", "weather; DROP").is_err());
        assert!(PostgresRecorder::new("postgres://localhost/weather", "").is_err());
    }
}
