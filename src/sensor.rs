//! 1-wire (DS18B20) temperature probe discovery and reading

use std::path::{Path, PathBuf};

use crate::errors::{ReadError, StartupError};

/// Device nodes for DS18B20 probes start with the family code `28-`.
const W1_FAMILY_PREFIX: &str = "28-";
/// The sysfs file holding the sensor's raw report.
const W1_DEVNODE: &str = "w1_slave";

/// Scan the 1-wire sysfs base directory for a temperature probe.
///
/// The first matching device wins. The resolved path is treated as fixed for
/// the process lifetime; there is no re-discovery on later read failures.
pub fn discover(base: &Path) -> Result<PathBuf, StartupError> {
    let entries = std::fs::read_dir(base).map_err(|source| StartupError::SensorScan {
        base: base.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(W1_FAMILY_PREFIX) {
            return Ok(entry.path().join(W1_DEVNODE));
        }
    }

    Err(StartupError::SensorNotFound {
        base: base.to_path_buf(),
    })
}

/// Read and parse one temperature sample from the probe's w1_slave node.
pub async fn read(path: &Path) -> Result<f64, ReadError> {
    let report = tokio::fs::read_to_string(path).await?;
    parse_w1_report(&report)
}

/// Parse the kernel's two-line w1_slave report.
///
/// The first line ends in ` YES` when the on-wire CRC checked out; the
/// second carries the temperature in millidegrees after `t=`.
fn parse_w1_report(report: &str) -> Result<f64, ReadError> {
    if !report.lines().any(|line| line.contains(" YES")) {
        return Err(ReadError::CrcInvalid);
    }

    let raw = report
        .lines()
        .find_map(|line| line.split_once("t=").map(|(_, v)| v.trim()))
        .ok_or(ReadError::Malformed)?;

    let millidegrees: i32 = raw.parse().map_err(|_| ReadError::Malformed)?;
    Ok(f64::from(millidegrees) / 1000.0)
}
