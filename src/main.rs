use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};

use weatherd::config::StationConfig;
use weatherd::counters::TickCounter;
use weatherd::errors::StartupError;
use weatherd::gpio::EdgePin;
use weatherd::recorders::{csv::CsvRecorder, postgres::PostgresRecorder, rest::RestRecorder, Registry};
use weatherd::sampler::Sampler;
use weatherd::sensor;

fn fail(e: StartupError) -> ExitCode {
    error!("{}", e);
    ExitCode::from(e.exit_code() as u8)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => return fail(e),
    };

    // Resolve the temperature probe once; the path is fixed for the
    // process lifetime.
    let sensor_path = match sensor::discover(&config.w1_base_path) {
        Ok(path) => path,
        Err(e) => return fail(e),
    };
    info!("Temperature sensor: {}", sensor_path.display());

    // Register recorders before any interrupt is armed; the registry is
    // read-only from here on.
    let mut registry = Registry::new();
    if let Some(path) = &config.csv_path {
        registry.register("csv", Box::new(CsvRecorder::new(path)));
    }
    if let Some(endpoint) = &config.http_endpoint {
        registry.register("rest", Box::new(RestRecorder::new(endpoint.clone())));
    }
    if let Some(url) = &config.database_url {
        match PostgresRecorder::new(url.clone(), config.database_table.clone()) {
            Ok(recorder) => registry.register("postgres", Box::new(recorder)),
            Err(e) => return fail(StartupError::Config(e.to_string())),
        }
    }
    if registry.is_empty() {
        warn!("No recorders configured; measurements will only be displayed");
    } else {
        info!(
            "Recorders: {}",
            registry.names().collect::<Vec<_>>().join(", ")
        );
    }

    // Arm the edge-triggered sensors last, so every tick they produce lands
    // in a fully wired station.
    let wind = Arc::new(TickCounter::new());
    let rain = Arc::new(TickCounter::new());

    let wind_counter = Arc::clone(&wind);
    if let Err(e) = EdgePin::open(config.wind_pin)
        .and_then(|pin| pin.watch(move || wind_counter.increment()))
    {
        return fail(StartupError::WindInterrupt(e));
    }
    let rain_counter = Arc::clone(&rain);
    if let Err(e) = EdgePin::open(config.rain_pin)
        .and_then(|pin| pin.watch(move || rain_counter.increment()))
    {
        return fail(StartupError::RainInterrupt(e));
    }

    let sampler = Sampler::new(config, sensor_path, wind, rain, registry);

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run the sampling loop or wait for the shutdown signal
    tokio::select! {
        _ = sampler.run() => {}
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    ExitCode::SUCCESS
}
