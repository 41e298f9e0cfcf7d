//! Telemetry-sampling benchmark runner
//!
//! The workload (load package, run N frames in throughput mode) runs on a
//! scoped worker thread and hands its result back over a channel exactly
//! once. The calling thread samples worker CPU, device power and device
//! temperature, then waits on the channel for one sampling interval, until
//! the result arrives. Samples are pooled over `loop_average` invocations;
//! fps is averaged over invocations.
//!
//! ```text
//! IDLE → LAUNCHED → SAMPLING ⟲ → JOINING → REDUCED → (repeat) → AVERAGED
//! ```

use crate::config::BenchmarkConfig;
use crate::error::{HarnessError, Result};
use crate::outcome::TelemetryAverages;
use mxa_driver::{Accelerator, DeviceGroup, RunOutput, Telemetry};
use rustix::time::{clock_gettime, ClockId};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runner state, logged at debug level on each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started
    Idle,
    /// Worker spawned
    Launched,
    /// Polling telemetry
    Sampling,
    /// Result received, joining the worker
    Joining,
    /// One invocation reduced
    Reduced,
    /// All invocations averaged
    Averaged,
}

/// Arithmetic mean; `None` for an empty slice
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn process_cpu_time() -> Duration {
    let ts = clock_gettime(ClockId::ProcessCPUTime);
    Duration::new(
        u64::try_from(ts.tv_sec).unwrap_or(0),
        u32::try_from(ts.tv_nsec).unwrap_or(0),
    )
}

/// CPU utilization of this process between successive samples
///
/// Reported as percent of one logical core, so a busy multi-threaded
/// workload can exceed 100.
#[derive(Debug)]
pub struct CpuMeter {
    last_cpu: Duration,
    last_wall: Instant,
}

impl CpuMeter {
    /// Start measuring from now
    pub fn start() -> Self {
        Self {
            last_cpu: process_cpu_time(),
            last_wall: Instant::now(),
        }
    }

    /// Utilization since the previous sample; `None` if no wall time passed
    pub fn sample(&mut self) -> Option<f64> {
        let cpu = process_cpu_time();
        let wall = Instant::now();
        let wall_delta = wall.duration_since(self.last_wall).as_secs_f64();
        let cpu_delta = cpu.saturating_sub(self.last_cpu).as_secs_f64();
        self.last_cpu = cpu;
        self.last_wall = wall;
        (wall_delta > 0.0).then(|| cpu_delta / wall_delta * 100.0)
    }
}

#[derive(Debug, Default)]
struct Samples {
    cpu: Vec<f64>,
    power: Vec<f64>,
    temperature: Vec<f64>,
}

impl Samples {
    fn take<T: Telemetry + ?Sized>(&mut self, meter: &mut CpuMeter, telemetry: &T, group: DeviceGroup) {
        if let Some(cpu) = meter.sample() {
            self.cpu.push(cpu);
        }
        match telemetry.power_mw(group) {
            Ok(p) => self.power.push(p),
            Err(e) => debug!("power sample skipped: {e}"),
        }
        match telemetry.temperature_c(group) {
            Ok(t) => self.temperature.push(t),
            Err(e) => debug!("temperature sample skipped: {e}"),
        }
    }

    fn reduce(&self) -> TelemetryAverages {
        TelemetryAverages {
            cpu_percent: mean(&self.cpu),
            power_mw: mean(&self.power),
            temperature_c: mean(&self.temperature),
        }
    }
}

/// Result of a full benchmark invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    /// Output of the last invocation
    pub last: RunOutput,
    /// fps averaged over invocations
    pub fps: f64,
    /// Telemetry pooled over invocations
    pub telemetry: TelemetryAverages,
    /// Number of invocations
    pub loops: u32,
    complete: bool,
}

impl BenchmarkReport {
    /// True when every invocation gave the throughput success signal
    pub const fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Benchmark runner
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    group: DeviceGroup,
}

impl BenchmarkRunner {
    /// Create a runner sampling `group`
    pub const fn new(config: BenchmarkConfig, group: DeviceGroup) -> Self {
        Self { config, group }
    }

    fn transition(phase: &mut Phase, next: Phase) {
        debug!("benchmark {phase:?} -> {next:?}");
        *phase = next;
    }

    /// Run the benchmark for one package
    ///
    /// # Errors
    ///
    /// Returns error if any invocation fails; there are no retries.
    pub fn run<T>(
        &self,
        accelerator: &mut dyn Accelerator,
        telemetry: &T,
        package: &Path,
    ) -> Result<BenchmarkReport>
    where
        T: Telemetry + ?Sized,
    {
        let loops = self.config.loop_average.max(1);
        let frames = self.config.frames;
        let interval = self.config.interval;
        let mut phase = Phase::Idle;
        let mut samples = Samples::default();
        let mut fps = Vec::with_capacity(loops as usize);
        let mut last = None;
        let mut complete = true;

        for i in 0..loops {
            let (tx, rx) = mpsc::channel();
            let acc = &mut *accelerator;

            let output = std::thread::scope(|scope| -> Result<RunOutput> {
                let worker = scope.spawn(move || {
                    let _ = tx.send(acc.run(package, None, frames, true));
                });
                Self::transition(&mut phase, Phase::Launched);
                let mut meter = CpuMeter::start();

                Self::transition(&mut phase, Phase::Sampling);
                let received = loop {
                    samples.take(&mut meter, telemetry, self.group);
                    match rx.recv_timeout(interval) {
                        Ok(result) => break Some(result),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break None,
                    }
                };

                Self::transition(&mut phase, Phase::Joining);
                let joined = worker.join();
                match (received, joined) {
                    (Some(result), _) => Ok(result?),
                    (None, Err(_)) => Err(HarnessError::worker_failed("worker panicked")),
                    (None, Ok(())) => Err(HarnessError::worker_failed("worker sent no result")),
                }
            })?;

            Self::transition(&mut phase, Phase::Reduced);
            let t = samples.reduce();
            info!(
                "loop {i}: fps={:.2}, cpu={:?}, power={:?}, temperature={:?}",
                output.fps, t.cpu_percent, t.power_mw, t.temperature_c
            );
            if !output.is_throughput_complete() {
                warn!("loop {i}: no throughput signal (latency {})", output.latency_ms);
                complete = false;
            }
            fps.push(output.fps);
            last = Some(output);
        }

        Self::transition(&mut phase, Phase::Averaged);
        let last = last.ok_or_else(|| HarnessError::worker_failed("no invocation ran"))?;
        let telemetry = samples.reduce();
        if telemetry.is_empty() {
            warn!("no telemetry available for {}", package.display());
        }
        Ok(BenchmarkReport {
            last,
            fps: mean(&fps).unwrap_or(0.0),
            telemetry,
            loops,
            complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxa_driver::{BackendType, DeviceIdentity, MxaError, SoftwareTelemetry, LATENCY_SENTINEL};
    use std::time::Duration;

    #[derive(Debug)]
    struct SlowAccelerator {
        delay: Duration,
        fps: f64,
        fail: bool,
    }

    impl Accelerator for SlowAccelerator {
        fn run(
            &mut self,
            _package: &Path,
            _inputs: Option<&[mxa_driver::Tensor]>,
            _frames: u32,
            _threaded: bool,
        ) -> mxa_driver::Result<RunOutput> {
            std::thread::sleep(self.delay);
            if self.fail {
                return Err(MxaError::run_failed("stalled"));
            }
            Ok(RunOutput { outputs: None, latency_ms: LATENCY_SENTINEL, fps: self.fps })
        }

        fn backend_type(&self) -> BackendType {
            BackendType::Software
        }
    }

    #[derive(Debug)]
    struct NoTelemetry;

    impl Telemetry for NoTelemetry {
        fn power_mw(&self, _: DeviceGroup) -> mxa_driver::Result<f64> {
            Err(MxaError::invalid_state("none"))
        }
        fn temperature_c(&self, _: DeviceGroup) -> mxa_driver::Result<f64> {
            Err(MxaError::invalid_state("none"))
        }
        fn frequency_mhz(&self, _: DeviceGroup) -> mxa_driver::Result<f64> {
            Err(MxaError::invalid_state("none"))
        }
        fn voltage_mv(&self, _: DeviceGroup) -> mxa_driver::Result<f64> {
            Err(MxaError::invalid_state("none"))
        }
        fn thermal_threshold_c(&self, _: DeviceGroup) -> mxa_driver::Result<f64> {
            Err(MxaError::invalid_state("none"))
        }
        fn identity(&self, _: DeviceGroup) -> mxa_driver::Result<DeviceIdentity> {
            Ok(DeviceIdentity::default())
        }
        fn backend_type(&self) -> BackendType {
            BackendType::Software
        }
    }

    #[test]
    fn mean_of_power_samples() {
        assert_eq!(mean(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn samples_while_worker_runs() {
        let mut acc = SlowAccelerator { delay: Duration::from_millis(20), fps: 250.0, fail: false };
        let tel = SoftwareTelemetry::new();
        let runner = BenchmarkRunner::new(BenchmarkConfig::default(), DeviceGroup(0));

        let report = runner.run(&mut acc, &tel, Path::new("model.dfp")).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.fps, 250.0);
        let expected_power = tel.power_mw(DeviceGroup(0)).unwrap();
        let power = report.telemetry.power_mw.unwrap();
        assert!((power - expected_power).abs() < 1e-6);
        assert!(report.telemetry.cpu_percent.is_some());
    }

    #[test]
    fn fps_averaged_over_loops() {
        #[derive(Debug)]
        struct Alternating(u32);
        impl Accelerator for Alternating {
            fn run(
                &mut self,
                _: &Path,
                _: Option<&[mxa_driver::Tensor]>,
                _: u32,
                _: bool,
            ) -> mxa_driver::Result<RunOutput> {
                self.0 += 1;
                let fps = if self.0 % 2 == 1 { 100.0 } else { 200.0 };
                Ok(RunOutput { outputs: None, latency_ms: LATENCY_SENTINEL, fps })
            }
            fn backend_type(&self) -> BackendType {
                BackendType::Software
            }
        }

        let config = BenchmarkConfig { loop_average: 2, ..BenchmarkConfig::default() };
        let runner = BenchmarkRunner::new(config, DeviceGroup(0));
        let mut acc = Alternating(0);
        let report = runner.run(&mut acc, &SoftwareTelemetry::new(), Path::new("x")).unwrap();
        assert_eq!(report.loops, 2);
        assert_eq!(report.fps, 150.0);
    }

    #[test]
    fn one_signalless_loop_makes_report_incomplete() {
        #[derive(Debug)]
        struct Mixed(u32);
        impl Accelerator for Mixed {
            fn run(
                &mut self,
                _: &Path,
                _: Option<&[mxa_driver::Tensor]>,
                _: u32,
                _: bool,
            ) -> mxa_driver::Result<RunOutput> {
                self.0 += 1;
                Ok(if self.0 == 1 {
                    RunOutput { outputs: Some(Vec::new()), latency_ms: 3.0, fps: 9999.0 }
                } else {
                    RunOutput { outputs: None, latency_ms: LATENCY_SENTINEL, fps: 1.0 }
                })
            }
            fn backend_type(&self) -> BackendType {
                BackendType::Software
            }
        }

        let config = BenchmarkConfig { loop_average: 2, ..BenchmarkConfig::default() };
        let runner = BenchmarkRunner::new(config, DeviceGroup(0));
        let report = runner.run(&mut Mixed(0), &SoftwareTelemetry::new(), Path::new("x")).unwrap();
        assert!(report.last.is_throughput_complete());
        assert!(!report.is_complete());
    }

    #[test]
    fn no_samples_means_no_telemetry() {
        let mut acc = SlowAccelerator { delay: Duration::ZERO, fps: 1.0, fail: false };
        let runner = BenchmarkRunner::new(BenchmarkConfig::default(), DeviceGroup(0));
        let report = runner.run(&mut acc, &NoTelemetry, Path::new("x")).unwrap();
        assert_eq!(report.telemetry.power_mw, None);
        assert_eq!(report.telemetry.temperature_c, None);
        assert!(report.telemetry.is_empty());
    }

    #[test]
    fn workload_error_is_fatal() {
        let mut acc = SlowAccelerator { delay: Duration::from_millis(2), fps: 1.0, fail: true };
        let runner = BenchmarkRunner::new(BenchmarkConfig::default(), DeviceGroup(0));
        let err = runner.run(&mut acc, &NoTelemetry, Path::new("x")).unwrap_err();
        assert!(matches!(err, HarnessError::Device { .. }));
    }
}
