//! Measurement log: one JSON object per evaluated testcase

use crate::error::Result;
use crate::host::HostInfo;
use crate::outcome::RunResult;
use mxa_driver::DeviceIdentity;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Timestamp format of [`MeasurementRecord::timestamp`]
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One measurement row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Local time of the record
    pub timestamp: String,
    /// Host facts
    pub host: HostInfo,
    /// Kernel driver version
    pub kdriver_version: Option<String>,
    /// Firmware commit id
    pub fw_commit_id: Option<String>,
    /// Firmware date code
    pub date_code: Option<String>,
    /// Manufacturer id
    pub manufacturer_id: Option<String>,
    /// MPU clock in MHz
    pub frequency_mhz: Option<f64>,
    /// Core supply in mV
    pub voltage_mv: Option<f64>,
    /// Thermal threshold in °C
    pub thermal_threshold_c: Option<f64>,
    /// Testcase identity
    pub model: String,
    /// Frames per second
    pub fps: Option<f64>,
    /// Worker CPU, percent of one core
    pub cpu_percent: Option<f64>,
    /// Device power in mW
    pub power_mw: Option<f64>,
    /// Device temperature in °C
    pub temperature_c: Option<f64>,
    /// Outcome label
    pub result: String,
}

impl MeasurementRecord {
    /// Build a record stamped with the current local time
    pub fn new(host: &HostInfo, identity: &DeviceIdentity, result: &RunResult) -> Self {
        let t = result.telemetry.unwrap_or_default();
        let op = result.operating_point;
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            host: host.clone(),
            kdriver_version: identity.kdriver_version.clone(),
            fw_commit_id: identity.fw_commit_id.clone(),
            date_code: identity.date_code.clone(),
            manufacturer_id: identity.manufacturer_id.clone(),
            frequency_mhz: op.map(|o| o.frequency_mhz),
            voltage_mv: op.map(|o| o.voltage_mv),
            thermal_threshold_c: op.map(|o| o.thermal_threshold_c),
            model: result.model.clone(),
            fps: result.fps,
            cpu_percent: t.cpu_percent,
            power_mw: t.power_mw,
            temperature_c: t.temperature_c,
            result: result.outcome.label().to_string(),
        }
    }
}

/// Append-only JSON-lines sink
#[derive(Debug)]
pub struct MeasurementLog {
    path: PathBuf,
    file: File,
}

impl MeasurementLog {
    /// Open `path` for appending, creating it and its parent if needed
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Log path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be written.
    pub fn record(&mut self, record: &MeasurementRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()?;
        Ok(())
    }

    /// Read every record back
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not a record.
    pub fn read_all(path: &Path) -> Result<Vec<MeasurementRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                out.push(serde_json::from_str(&line)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, TelemetryAverages};
    use mxa_driver::OperatingPoint;
    use tempfile::TempDir;

    #[test]
    fn appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log/measurements.jsonl");
        let host = HostInfo {
            os_name: "Linux 6.8".into(),
            logical_cpus: 8,
            ..HostInfo::default()
        };
        let identity = DeviceIdentity {
            kdriver_version: Some("1.1.9".into()),
            ..DeviceIdentity::default()
        };
        let pass = RunResult::passed("k_a", 120.0)
            .with_telemetry(TelemetryAverages {
                cpu_percent: Some(30.0),
                power_mw: Some(900.0),
                temperature_c: Some(45.0),
            })
            .with_operating_point(Some(OperatingPoint {
                frequency_mhz: 600.0,
                voltage_mv: 700.0,
                thermal_threshold_c: 100.0,
            }));

        {
            let mut log = MeasurementLog::open(&path).unwrap();
            log.record(&MeasurementRecord::new(&host, &identity, &pass)).unwrap();
        }
        let mut log = MeasurementLog::open(&path).unwrap();
        let failed = RunResult::failed("k_b", Outcome::DfpMissing);
        log.record(&MeasurementRecord::new(&host, &identity, &failed)).unwrap();

        let records = MeasurementLog::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model, "k_a");
        assert_eq!(records[0].power_mw, Some(900.0));
        assert_eq!(records[0].frequency_mhz, Some(600.0));
        assert_eq!(records[0].kdriver_version.as_deref(), Some("1.1.9"));
        assert_eq!(records[1].result, "DFP missing");
        assert_eq!(records[1].fps, None);
        assert_eq!(records[1].timestamp.len(), 19);
    }
}
