//! Accelerator and telemetry backend implementations
//!
//! - **Sysfs**: kernel driver attributes under `/sys/memx{group}` plus hwmon power
//! - **Software**: virtual MPU and modelled telemetry, no hardware required

pub mod software;
pub mod sysfs;

pub use software::{SoftwareAccelerator, SoftwareTelemetry};
pub use sysfs::SysfsTelemetry;

use std::path::Path;

/// Read group power from hwmon sysfs, in mW.
///
/// Enumerates `{root}/class/hwmon/hwmon*/` and picks the entry whose `name`
/// matches `node` (e.g. `memx0`), reading `power1_average` in µW.
pub(crate) fn read_hwmon_power(root: &Path, node: &str) -> Option<f64> {
    let hwmon_dir = root.join("class/hwmon");
    for entry in std::fs::read_dir(hwmon_dir).ok()?.flatten() {
        let Ok(name) = std::fs::read_to_string(entry.path().join("name")) else {
            continue;
        };
        if name.trim() != node {
            continue;
        }
        if let Ok(content) = std::fs::read_to_string(entry.path().join("power1_average")) {
            if let Ok(microwatts) = content.trim().parse::<u64>() {
                #[allow(clippy::cast_precision_loss)]
                let milliwatts = microwatts as f64 / 1000.0;
                return Some(milliwatts);
            }
        }
    }
    None
}

/// Average the per-chip readings of the `temperature` attribute.
///
/// Each chip prints a line like
/// `CHIP(0) PVT0 Temperature: Temperature: 45 C (318 Kelvin) (...)`.
pub(crate) fn parse_temperature(text: &str) -> Option<f64> {
    let readings: Vec<f64> = text
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens
                .windows(2)
                .find(|w| w[1] == "C")
                .and_then(|w| w[0].parse::<f64>().ok())
        })
        .collect();
    if readings.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = readings.iter().sum::<f64>() / readings.len() as f64;
    Some(mean)
}
