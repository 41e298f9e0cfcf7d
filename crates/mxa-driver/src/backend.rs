//! Collaborator traits for the accelerator runtime and device telemetry
//!
//! The harness drives two independent seams: an [`Accelerator`] that loads a
//! package and runs frames, and a [`Telemetry`] source (optionally with
//! [`OperatingPointControl`]) addressed by device group.

use crate::error::Result;
use crate::identity::DeviceIdentity;
use crate::tensor::Tensor;
use std::fmt::Debug;
use std::path::Path;

/// Latency reported by a threaded throughput run
pub const LATENCY_SENTINEL: f64 = -1.0;

/// Device group index (`/sys/memx{group}`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceGroup(pub u8);

impl std::fmt::Display for DeviceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memx{}", self.0)
    }
}

/// Result of one accelerator invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// One stacked tensor per active output port; `None` in throughput mode
    pub outputs: Option<Vec<Tensor>>,
    /// Per-frame latency in milliseconds, or [`LATENCY_SENTINEL`]
    pub latency_ms: f64,
    /// Frames per second
    pub fps: f64,
}

impl RunOutput {
    /// Throughput run finished: no outputs and the latency sentinel
    #[allow(clippy::float_cmp)]
    pub fn is_throughput_complete(&self) -> bool {
        self.outputs.is_none() && self.latency_ms == LATENCY_SENTINEL
    }
}

/// Accelerator runtime collaborator
///
/// Inputs, when given, hold one tensor per active input port with frames
/// stacked on the outermost axis. Without inputs the runtime feeds synthetic
/// data and measures throughput only.
pub trait Accelerator: Debug + Send {
    /// Load `package` and run `frames` frames
    ///
    /// # Errors
    ///
    /// Returns error if the package cannot be loaded or the device stalls.
    fn run(
        &mut self,
        package: &Path,
        inputs: Option<&[Tensor]>,
        frames: u32,
        threaded: bool,
    ) -> Result<RunOutput>;

    /// Backend type for logging
    fn backend_type(&self) -> BackendType;
}

/// Device clock, supply and thermal settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperatingPoint {
    /// MPU clock in MHz
    pub frequency_mhz: f64,
    /// Core supply in mV
    pub voltage_mv: f64,
    /// Thermal throttling threshold in °C
    pub thermal_threshold_c: f64,
}

/// Device telemetry collaborator
pub trait Telemetry: Debug + Send + Sync {
    /// Current power draw in mW
    ///
    /// # Errors
    ///
    /// Returns error if the measurement is unavailable.
    fn power_mw(&self, group: DeviceGroup) -> Result<f64>;

    /// Current die temperature in °C
    ///
    /// # Errors
    ///
    /// Returns error if the measurement is unavailable.
    fn temperature_c(&self, group: DeviceGroup) -> Result<f64>;

    /// Current MPU clock in MHz
    ///
    /// # Errors
    ///
    /// Returns error if the attribute cannot be read.
    fn frequency_mhz(&self, group: DeviceGroup) -> Result<f64>;

    /// Current supply voltage in mV
    ///
    /// # Errors
    ///
    /// Returns error if the attribute cannot be read.
    fn voltage_mv(&self, group: DeviceGroup) -> Result<f64>;

    /// Thermal throttling threshold in °C
    ///
    /// # Errors
    ///
    /// Returns error if the attribute cannot be read.
    fn thermal_threshold_c(&self, group: DeviceGroup) -> Result<f64>;

    /// Driver and firmware identifiers
    ///
    /// # Errors
    ///
    /// Returns error if version info cannot be read.
    fn identity(&self, group: DeviceGroup) -> Result<DeviceIdentity>;

    /// Backend type for logging
    fn backend_type(&self) -> BackendType;

    /// Read the full operating point
    ///
    /// # Errors
    ///
    /// Returns error if any of the three attributes cannot be read.
    fn operating_point(&self, group: DeviceGroup) -> Result<OperatingPoint> {
        Ok(OperatingPoint {
            frequency_mhz: self.frequency_mhz(group)?,
            voltage_mv: self.voltage_mv(group)?,
            thermal_threshold_c: self.thermal_threshold_c(group)?,
        })
    }
}

/// Operating point setters
pub trait OperatingPointControl: Send + Sync {
    /// Set the MPU clock for every chip in the group
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the value.
    fn set_frequency_mhz(&self, group: DeviceGroup, mhz: u32) -> Result<()>;

    /// Set the core supply voltage
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the value.
    fn set_voltage_mv(&self, group: DeviceGroup, mv: u32) -> Result<()>;

    /// Set the thermal throttling threshold
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the value.
    fn set_thermal_threshold_c(&self, group: DeviceGroup, celsius: u32) -> Result<()>;
}

/// Telemetry plus control, what a pass needs from the device
pub trait DeviceAccess: Telemetry + OperatingPointControl {}

impl<T: Telemetry + OperatingPointControl + ?Sized> DeviceAccess for T {}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Kernel driver attributes under `/sys/memx*`
    Sysfs,

    /// Software (virtual MPU), no hardware required
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sysfs => write!(f, "Sysfs"),
            Self::Software => write!(f, "Software (VirtualMPU)"),
        }
    }
}

/// Telemetry backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetrySelection {
    /// Sysfs when the group node exists, software otherwise
    #[default]
    Auto,

    /// Force the sysfs backend
    Sysfs,

    /// Force the software backend
    Software,
}

/// Select a telemetry backend for `group` under `sysfs_root`
///
/// # Errors
///
/// Returns error if the sysfs backend is forced and the group node is absent.
pub fn select_telemetry(
    selection: TelemetrySelection,
    sysfs_root: &Path,
    group: DeviceGroup,
) -> Result<Box<dyn DeviceAccess>> {
    use crate::backends::software::SoftwareTelemetry;
    use crate::backends::sysfs::SysfsTelemetry;

    match selection {
        TelemetrySelection::Auto => {
            if let Ok(backend) = SysfsTelemetry::open(sysfs_root, group) {
                tracing::info!("Using sysfs telemetry for {group}");
                return Ok(Box::new(backend));
            }
            tracing::info!("No {group} under {}, using software telemetry", sysfs_root.display());
            Ok(Box::new(SoftwareTelemetry::new()))
        }

        TelemetrySelection::Sysfs => {
            SysfsTelemetry::open(sysfs_root, group).map(|b| Box::new(b) as Box<dyn DeviceAccess>)
        }

        TelemetrySelection::Software => Ok(Box::new(SoftwareTelemetry::new())),
    }
}
