//! Accelerator and telemetry collaborators for the MX validation harness.
//!
//! The harness never talks to hardware directly. It drives an
//! [`Accelerator`] (load a package, run N frames, hand back outputs, latency
//! and throughput) and reads a [`Telemetry`] source addressed by
//! [`DeviceGroup`].
//!
//! # Backends
//!
//! ```text
//! Telemetry:
//!   SysfsTelemetry   : /sys/memx{g} attributes + hwmon power
//!   SoftwareTelemetry: modelled power/temperature, settable operating point
//!
//! Accelerator:
//!   SoftwareAccelerator: virtual MPU executing software packages
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use mxa_driver::{select_telemetry, DeviceGroup, Telemetry, TelemetrySelection};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dev = select_telemetry(TelemetrySelection::Auto, Path::new("/sys"), DeviceGroup(0))?;
//! let op = dev.operating_point(DeviceGroup(0))?;
//! println!("{} MHz, {} mV, {:.1} mW", op.frequency_mhz, op.voltage_mv, dev.power_mw(DeviceGroup(0))?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

mod backend;
pub mod backends;
mod error;
mod identity;
mod tensor;

pub use backend::{
    select_telemetry, Accelerator, BackendType, DeviceAccess, DeviceGroup, OperatingPoint,
    OperatingPointControl, RunOutput, Telemetry, TelemetrySelection, LATENCY_SENTINEL,
};
pub use backends::sysfs::DEFAULT_SYSFS_ROOT;
pub use backends::{SoftwareAccelerator, SoftwareTelemetry, SysfsTelemetry};
pub use error::{MxaError, Result};
pub use identity::{parse_verinfo, DeviceIdentity};
pub use tensor::{Tensor, TensorData};
