// SPDX-License-Identifier: AGPL-3.0-only

//! Sysfs telemetry backend
//!
//! The kernel driver publishes one directory per device group:
//!
//! ```text
//! {root}/memx{g}/temperature         per-chip lines, "... 45 C ..."
//! {root}/memx{g}/verinfo             driver / firmware identifiers
//! {root}/memx{g}/mpu_frequency       MHz, read/write
//! {root}/memx{g}/mpu_voltage         mV, read/write
//! {root}/memx{g}/thermal_threshold   °C, read/write
//! {root}/class/hwmon/hwmon*/power1_average   µW, hwmon `name` == memx{g}
//! ```
//!
//! `root` is `/sys` in production and a temporary tree in tests.

use crate::backend::{BackendType, DeviceGroup, OperatingPointControl, Telemetry};
use crate::backends::{parse_temperature, read_hwmon_power};
use crate::error::{MxaError, Result};
use crate::identity::{parse_verinfo, DeviceIdentity};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default sysfs mount point
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Telemetry read from kernel driver attributes
#[derive(Debug, Clone)]
pub struct SysfsTelemetry {
    root: PathBuf,
}

impl SysfsTelemetry {
    /// Open the backend, checking that `group` has a node under `root`
    ///
    /// # Errors
    ///
    /// Returns error if `{root}/memx{group}` does not exist.
    pub fn open(root: impl Into<PathBuf>, group: DeviceGroup) -> Result<Self> {
        let backend = Self { root: root.into() };
        let node = backend.node(group);
        if !node.is_dir() {
            return Err(MxaError::device_not_found(node));
        }
        debug!("sysfs telemetry at {}", node.display());
        Ok(backend)
    }

    /// Sysfs root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node(&self, group: DeviceGroup) -> PathBuf {
        self.root.join(group.to_string())
    }

    fn read_attr(&self, group: DeviceGroup, attr: &str) -> Result<String> {
        let path = self.node(group).join(attr);
        if !path.exists() {
            return Err(MxaError::attribute_unavailable(path));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn read_number(&self, group: DeviceGroup, attr: &str) -> Result<f64> {
        let raw = self.read_attr(group, attr)?;
        raw.split_whitespace()
            .next()
            .and_then(|tok| tok.parse::<f64>().ok())
            .ok_or_else(|| MxaError::ParseFailed {
                path: self.node(group).join(attr),
                value: raw.trim().to_string(),
            })
    }

    fn write_attr(&self, group: DeviceGroup, attr: &str, value: u32) -> Result<()> {
        let path = self.node(group).join(attr);
        if !path.exists() {
            return Err(MxaError::attribute_unavailable(path));
        }
        debug!("write {} <- {value}", path.display());
        std::fs::write(path, format!("{value}\n"))?;
        Ok(())
    }
}

impl Telemetry for SysfsTelemetry {
    fn power_mw(&self, group: DeviceGroup) -> Result<f64> {
        read_hwmon_power(&self.root, &group.to_string())
            .ok_or_else(|| MxaError::attribute_unavailable(self.root.join("class/hwmon")))
    }

    fn temperature_c(&self, group: DeviceGroup) -> Result<f64> {
        let raw = self.read_attr(group, "temperature")?;
        parse_temperature(&raw).ok_or_else(|| MxaError::ParseFailed {
            path: self.node(group).join("temperature"),
            value: raw.trim().to_string(),
        })
    }

    fn frequency_mhz(&self, group: DeviceGroup) -> Result<f64> {
        self.read_number(group, "mpu_frequency")
    }

    fn voltage_mv(&self, group: DeviceGroup) -> Result<f64> {
        self.read_number(group, "mpu_voltage")
    }

    fn thermal_threshold_c(&self, group: DeviceGroup) -> Result<f64> {
        self.read_number(group, "thermal_threshold")
    }

    fn identity(&self, group: DeviceGroup) -> Result<DeviceIdentity> {
        Ok(parse_verinfo(&self.read_attr(group, "verinfo")?))
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Sysfs
    }
}

impl OperatingPointControl for SysfsTelemetry {
    fn set_frequency_mhz(&self, group: DeviceGroup, mhz: u32) -> Result<()> {
        self.write_attr(group, "mpu_frequency", mhz)
    }

    fn set_voltage_mv(&self, group: DeviceGroup, mv: u32) -> Result<()> {
        self.write_attr(group, "mpu_voltage", mv)
    }

    fn set_thermal_threshold_c(&self, group: DeviceGroup, celsius: u32) -> Result<()> {
        self.write_attr(group, "thermal_threshold", celsius)
    }
}
