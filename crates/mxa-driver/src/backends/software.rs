// SPDX-License-Identifier: AGPL-3.0-only

//! Software (virtual MPU) backend
//!
//! Implements [`Accelerator`] and [`Telemetry`] in pure CPU code so that the
//! whole evaluation engine runs in CI without a device:
//!
//! 1. **Comparison mode**: given inputs, each active output port is computed
//!    as the affine transform its package declares over one input port,
//!    frame by frame.
//!
//! 2. **Throughput mode**: without inputs, frames are paced at a fixed frame
//!    time and the threaded run reports the latency sentinel, the same signal
//!    the device runtime gives.
//!
//! Telemetry is a deterministic model of the operating point, so power and
//! temperature move when a sweep changes frequency or voltage.

use crate::backend::{
    Accelerator, BackendType, DeviceGroup, OperatingPoint, OperatingPointControl, RunOutput,
    Telemetry, LATENCY_SENTINEL,
};
use crate::error::{MxaError, Result};
use crate::identity::DeviceIdentity;
use crate::tensor::{Tensor, TensorData};
use mxa_dfp::SoftwarePackage;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default simulated time per frame
pub const DEFAULT_FRAME_TIME: Duration = Duration::from_micros(200);

/// Software (virtual MPU) accelerator.
#[derive(Debug, Clone)]
pub struct SoftwareAccelerator {
    frame_time: Duration,
    runs: u64,
}

impl Default for SoftwareAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareAccelerator {
    /// Create with [`DEFAULT_FRAME_TIME`]
    pub const fn new() -> Self {
        Self {
            frame_time: DEFAULT_FRAME_TIME,
            runs: 0,
        }
    }

    /// Set the simulated time per frame
    #[must_use]
    pub const fn with_frame_time(mut self, frame_time: Duration) -> Self {
        self.frame_time = frame_time;
        self
    }

    /// Number of completed runs
    pub const fn runs(&self) -> u64 {
        self.runs
    }

    fn compute(package: &SoftwarePackage, inputs: &[Tensor], frames: usize) -> Result<Vec<Tensor>> {
        let active_inputs: Vec<usize> = package.info.active_inputs().map(|p| p.index).collect();
        if inputs.len() != active_inputs.len() {
            return Err(MxaError::run_failed(format!(
                "package expects {} input tensors, got {}",
                active_inputs.len(),
                inputs.len()
            )));
        }
        for (port, tensor) in active_inputs.iter().zip(inputs) {
            if tensor.frames() != frames {
                return Err(MxaError::run_failed(format!(
                    "ifmap {port} carries {} frames, expected {frames}",
                    tensor.frames()
                )));
            }
        }

        let mut outputs = Vec::new();
        for port in package.info.active_outputs() {
            let transform = package.transform_for(port.index).ok_or_else(|| {
                MxaError::run_failed(format!("no transform for ofmap {}", port.index))
            })?;
            let source = active_inputs
                .iter()
                .position(|&i| i == transform.source_input)
                .and_then(|pos| inputs.get(pos))
                .ok_or_else(|| {
                    MxaError::run_failed(format!(
                        "ofmap {} reads inactive ifmap {}",
                        port.index, transform.source_input
                    ))
                })?;

            let n = port.shape.total_elements();
            let mut values = Vec::with_capacity(n * frames);
            for f in 0..frames {
                let src = source
                    .frame(f)
                    .map(|t| t.to_f64())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| MxaError::run_failed("empty input frame"))?;
                values.extend((0..n).map(|j| {
                    transform.scale * src[j % src.len()] as f32 + transform.bias
                }));
            }
            outputs.push(Tensor::new(port.shape.with_frames(frames), TensorData::F32(values))?);
        }
        Ok(outputs)
    }

    fn pace(&self, start: Instant, frames: u32) {
        let target = self.frame_time * frames;
        let elapsed = start.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

impl Accelerator for SoftwareAccelerator {
    fn run(
        &mut self,
        package: &Path,
        inputs: Option<&[Tensor]>,
        frames: u32,
        threaded: bool,
    ) -> Result<RunOutput> {
        let pkg = SoftwarePackage::from_file(package)?;
        debug!(
            "SoftwareAccelerator: {} ({} in / {} out), {frames} frames",
            package.display(),
            pkg.info.input_ports.len(),
            pkg.info.output_ports.len()
        );

        let start = Instant::now();
        let outputs = match inputs {
            Some(inputs) => Some(Self::compute(&pkg, inputs, frames as usize)?),
            None => None,
        };
        self.pace(start, frames);
        let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
        self.runs += 1;

        let fps = f64::from(frames) / elapsed;
        let latency_ms = if outputs.is_none() && threaded {
            LATENCY_SENTINEL
        } else {
            elapsed * 1000.0 / f64::from(frames.max(1))
        };
        Ok(RunOutput {
            outputs,
            latency_ms,
            fps,
        })
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}

/// Modelled telemetry for the software backend.
///
/// `power = 250 + 0.002 · MHz · mV` (mW), `temperature = 30 + power / 50` (°C).
#[derive(Debug)]
pub struct SoftwareTelemetry {
    state: Mutex<OperatingPoint>,
}

impl Default for SoftwareTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareTelemetry {
    /// Create at 600 MHz, 700 mV, 100 °C threshold
    pub fn new() -> Self {
        Self::with_operating_point(OperatingPoint {
            frequency_mhz: 600.0,
            voltage_mv: 700.0,
            thermal_threshold_c: 100.0,
        })
    }

    /// Create at an explicit operating point
    pub fn with_operating_point(op: OperatingPoint) -> Self {
        info!(
            "SoftwareTelemetry: {} MHz, {} mV, threshold {} C",
            op.frequency_mhz, op.voltage_mv, op.thermal_threshold_c
        );
        Self {
            state: Mutex::new(op),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, OperatingPoint>> {
        self.state
            .lock()
            .map_err(|_| MxaError::invalid_state("software telemetry lock poisoned"))
    }

    fn modelled_power(op: &OperatingPoint) -> f64 {
        250.0 + 0.002 * op.frequency_mhz * op.voltage_mv
    }
}

impl Telemetry for SoftwareTelemetry {
    fn power_mw(&self, _group: DeviceGroup) -> Result<f64> {
        Ok(Self::modelled_power(&*self.state()?))
    }

    fn temperature_c(&self, _group: DeviceGroup) -> Result<f64> {
        Ok(30.0 + Self::modelled_power(&*self.state()?) / 50.0)
    }

    fn frequency_mhz(&self, _group: DeviceGroup) -> Result<f64> {
        Ok(self.state()?.frequency_mhz)
    }

    fn voltage_mv(&self, _group: DeviceGroup) -> Result<f64> {
        Ok(self.state()?.voltage_mv)
    }

    fn thermal_threshold_c(&self, _group: DeviceGroup) -> Result<f64> {
        Ok(self.state()?.thermal_threshold_c)
    }

    fn identity(&self, _group: DeviceGroup) -> Result<DeviceIdentity> {
        Ok(DeviceIdentity {
            kdriver_version: Some(format!("software-{}", env!("CARGO_PKG_VERSION"))),
            fw_commit_id: Some("0x00000000".into()),
            date_code: Some("0x00000000".into()),
            manufacturer_id: None,
        })
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}

impl OperatingPointControl for SoftwareTelemetry {
    fn set_frequency_mhz(&self, _group: DeviceGroup, mhz: u32) -> Result<()> {
        if mhz == 0 {
            return Err(MxaError::invalid_state("frequency must be positive"));
        }
        self.state()?.frequency_mhz = f64::from(mhz);
        Ok(())
    }

    fn set_voltage_mv(&self, _group: DeviceGroup, mv: u32) -> Result<()> {
        if mv == 0 {
            return Err(MxaError::invalid_state("voltage must be positive"));
        }
        self.state()?.voltage_mv = f64::from(mv);
        Ok(())
    }

    fn set_thermal_threshold_c(&self, _group: DeviceGroup, celsius: u32) -> Result<()> {
        self.state()?.thermal_threshold_c = f64::from(celsius);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxa_dfp::{
        ElementType, OutputTransform, PackageInfo, PackingFormat, PortDescriptor, Shape,
    };
    use tempfile::TempDir;

    fn write_package(dir: &Path) -> std::path::PathBuf {
        let info = PackageInfo::new(
            vec![PortDescriptor::active(0, Shape::new(vec![4]), PackingFormat::Fp32)],
            vec![PortDescriptor::active(0, Shape::new(vec![2]), PackingFormat::Fp32)],
        );
        let pkg = SoftwarePackage::new(
            info,
            vec![OutputTransform { source_input: 0, scale: 2.0, bias: 1.0 }],
        )
        .unwrap();
        let path = dir.join("model.dfp");
        pkg.write_to(&path).unwrap();
        path
    }

    #[test]
    fn comparison_mode_applies_transform_per_frame() {
        let dir = TempDir::new().unwrap();
        let path = write_package(dir.path());
        let input = Tensor::from_f64(
            Shape::new(vec![2, 4]),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            ElementType::F32,
        )
        .unwrap();

        let mut acc = SoftwareAccelerator::new().with_frame_time(Duration::ZERO);
        let out = acc.run(&path, Some(&[input]), 2, false).unwrap();
        let outputs = out.outputs.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape().dims, vec![2, 2]);
        assert_eq!(outputs[0].to_f64(), vec![3.0, 5.0, 11.0, 13.0]);
        assert!(out.latency_ms >= 0.0);
        assert_eq!(acc.runs(), 1);
    }

    #[test]
    fn threaded_throughput_reports_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = write_package(dir.path());
        let mut acc = SoftwareAccelerator::new().with_frame_time(Duration::from_micros(50));
        let out = acc.run(&path, None, 20, true).unwrap();
        assert!(out.is_throughput_complete());
        assert!(out.fps > 0.0);
    }

    #[test]
    fn wrong_input_count_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_package(dir.path());
        let mut acc = SoftwareAccelerator::new();
        assert!(acc.run(&path, Some(&[]), 2, false).is_err());
    }

    #[test]
    fn missing_package_fails() {
        let mut acc = SoftwareAccelerator::new();
        let err = acc.run(Path::new("/nonexistent/model.dfp"), None, 1, true).unwrap_err();
        assert!(matches!(err, MxaError::Package { .. }));
    }

    #[test]
    fn telemetry_follows_operating_point() {
        let tel = SoftwareTelemetry::new();
        let g = DeviceGroup(0);
        let before = tel.power_mw(g).unwrap();
        tel.set_frequency_mhz(g, 300).unwrap();
        assert_eq!(tel.frequency_mhz(g).unwrap(), 300.0);
        assert!(tel.power_mw(g).unwrap() < before);
        assert!(tel.set_voltage_mv(g, 0).is_err());
        assert_eq!(tel.operating_point(g).unwrap().voltage_mv, 700.0);
    }
}
