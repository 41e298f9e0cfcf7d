//! `mxa`: validation harness for MX accelerators.
//!
//! ```text
//! USAGE:
//!   mxa regression      Compare device outputs against golden tensors
//!   mxa performance     Benchmark throughput with telemetry, then report
//!   mxa report          Compare a performance ledger against the baseline
//!   mxa info            Host, driver and operating point summary
//!   mxa make-testcase   Write a software testcase with golden tensors
//! ```

mod console;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::Console;
use mxa_dfp::{
    OutputTransform, PackageInfo, PackingFormat, PortDescriptor, Shape, SoftwareInspector,
    SoftwarePackage,
};
use mxa_driver::{
    select_telemetry, DeviceAccess, DeviceGroup, SoftwareAccelerator, Telemetry,
    TelemetrySelection, DEFAULT_SYSFS_ROOT,
};
use mxa_harness::config::PACKAGE_FILE;
use mxa_harness::{
    fmap, report, BenchmarkConfig, Harness, HostInfo, MeasurementLog, PassKind,
    PerformanceConfig, RegressionConfig, Repeat, Setup, SweepAxis, SweepPlan,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mxa", about = "MX accelerator validation harness", version)]
struct Cli {
    /// Verbose logging (-v info, -vv debug)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run every testcase once and compare outputs with golden tensors.
    Regression {
        #[command(flatten)]
        pass: PassArgs,
        /// Golden frames per port.
        #[arg(long = "golden-frames", default_value_t = 2)]
        frames: usize,
    },
    /// Benchmark every testcase while sampling CPU, power and temperature.
    Performance {
        #[command(flatten)]
        pass: PassArgs,
        /// Frames per benchmark invocation.
        #[arg(short = 'f', long = "frames", default_value_t = 100)]
        frames: u32,
        /// Invocations averaged per testcase.
        #[arg(short = 'l', long = "loop-average", default_value_t = 1)]
        loop_average: u32,
        /// Telemetry sampling interval in milliseconds.
        #[arg(long = "interval-ms", default_value_t = 1)]
        interval_ms: u64,
    },
    /// Compare the performance ledger against the stored baseline.
    Report {
        /// Log directory holding the ledger and baseline.
        #[arg(long = "log", default_value = "log")]
        log_dir: PathBuf,
    },
    /// Print host facts, driver identity and the current operating point.
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Write a software testcase (package plus golden tensors).
    MakeTestcase {
        /// Testcase directory name; must start with a recognized prefix.
        name: String,
        /// Root folder for testcases.
        #[arg(long = "dir", default_value = "dfp")]
        dataflow_dir: PathBuf,
        /// Port shape, comma separated.
        #[arg(long, default_value = "1,8")]
        shape: String,
        /// Output ports (each an affine map of input 0).
        #[arg(long, default_value_t = 1)]
        outputs: usize,
        /// Golden frames.
        #[arg(long = "golden-frames", default_value_t = 2)]
        frames: usize,
        /// Output scale.
        #[arg(long, default_value_t = 2.0)]
        scale: f32,
        /// Output bias.
        #[arg(long, default_value_t = 0.5)]
        bias: f32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TelemetryArg {
    Auto,
    Sysfs,
    Software,
}

impl From<TelemetryArg> for TelemetrySelection {
    fn from(arg: TelemetryArg) -> Self {
        match arg {
            TelemetryArg::Auto => Self::Auto,
            TelemetryArg::Sysfs => Self::Sysfs,
            TelemetryArg::Software => Self::Software,
        }
    }
}

#[derive(Args)]
struct DeviceArgs {
    /// Device group index.
    #[arg(short = 'g', long = "group", default_value_t = 0)]
    group: u8,
    /// Telemetry backend.
    #[arg(long, value_enum, default_value_t = TelemetryArg::Auto)]
    telemetry: TelemetryArg,
    /// Root of the sysfs tree.
    #[arg(long = "sysfs-root", default_value = DEFAULT_SYSFS_ROOT)]
    sysfs_root: PathBuf,
}

impl DeviceArgs {
    fn group(&self) -> DeviceGroup {
        DeviceGroup(self.group)
    }

    fn open(&self) -> Result<Box<dyn DeviceAccess>> {
        select_telemetry(self.telemetry.into(), &self.sysfs_root, self.group())
            .with_context(|| format!("opening telemetry for {}", self.group()))
    }
}

#[derive(Args)]
struct PassArgs {
    /// Root folder holding testcase directories.
    #[arg(long = "dir", default_value = "dfp")]
    dataflow_dir: PathBuf,
    /// Folder for ledgers and reports.
    #[arg(long = "log", default_value = "log")]
    log_dir: PathBuf,
    /// Repeat passes with a fresh ledger until stopped.
    #[arg(long)]
    burning: bool,
    /// Burning duration in hours; 0 runs without end.
    #[arg(long, default_value_t = 0)]
    hours: u64,
    /// Sweep start frequency (MHz).
    #[arg(long = "freq-start", alias = "fs")]
    freq_start: Option<u32>,
    /// Sweep end frequency (MHz), inclusive.
    #[arg(long = "freq-end", alias = "fe")]
    freq_end: Option<u32>,
    /// Sweep frequency step (MHz).
    #[arg(long = "freq-step", alias = "fp")]
    freq_step: Option<u32>,
    /// Sweep start voltage (mV).
    #[arg(long = "volt-start", alias = "vs")]
    volt_start: Option<u32>,
    /// Sweep end voltage (mV), inclusive.
    #[arg(long = "volt-end", alias = "ve")]
    volt_end: Option<u32>,
    /// Sweep voltage step (mV).
    #[arg(long = "volt-step", alias = "vp")]
    volt_step: Option<u32>,
    /// Fixed core voltage applied before the first pass (mV).
    #[arg(long)]
    voltage: Option<u32>,
    /// Thermal throttling threshold applied before the first pass (°C).
    #[arg(long = "thermal-threshold")]
    thermal_threshold: Option<u32>,
    /// Append every result as JSON lines to this file.
    #[arg(long)]
    measurements: Option<PathBuf>,
    #[command(flatten)]
    device: DeviceArgs,
}

impl PassArgs {
    fn sweep_plan(&self) -> Result<SweepPlan> {
        Ok(SweepPlan {
            frequency: SweepAxis::from_parts(self.freq_start, self.freq_end, self.freq_step)?,
            voltage: SweepAxis::from_parts(self.volt_start, self.volt_end, self.volt_step)?,
        })
    }

    fn setup(&self) -> Setup {
        Setup {
            voltage_mv: self.voltage,
            thermal_threshold_c: self.thermal_threshold,
        }
    }

    fn harness(&self) -> Result<Harness> {
        let mut harness = Harness::new(
            Box::new(SoftwareAccelerator::new()),
            Box::new(SoftwareInspector),
            self.device.open()?,
        );
        if let Some(path) = &self.measurements {
            let log = MeasurementLog::open(path)
                .with_context(|| format!("opening measurement log {}", path.display()))?;
            harness = harness.with_measurement_log(log);
        }
        Ok(harness)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();

    match cli.command {
        Cmd::Regression { pass, frames } => cmd_regression(&pass, frames),
        Cmd::Performance {
            pass,
            frames,
            loop_average,
            interval_ms,
        } => {
            let bench = BenchmarkConfig {
                frames,
                loop_average,
                interval: Duration::from_millis(interval_ms),
            };
            cmd_performance(&pass, bench)
        }
        Cmd::Report { log_dir } => cmd_report(&log_dir),
        Cmd::Info { device } => cmd_info(&device),
        Cmd::MakeTestcase {
            name,
            dataflow_dir,
            shape,
            outputs,
            frames,
            scale,
            bias,
        } => cmd_make_testcase(&dataflow_dir, &name, &shape, outputs, frames, scale, bias),
    }
}

/// Printed when a timed burn runs out; indefinite burns only end on error
const fn closing_line(repeat: &Repeat) -> Option<&'static str> {
    match repeat {
        Repeat::For(_) => Some("time is up"),
        Repeat::Once | Repeat::Forever => None,
    }
}

fn run_campaign(pass: &PassArgs, harness: &mut Harness, kind: PassKind<'_>) -> Result<ExitCode> {
    let plan = pass.sweep_plan()?;
    let repeat = Repeat::from_args(pass.burning, pass.hours);
    let setup = pass.setup();
    info!(
        "campaign: {} sweep point(s), burning={}",
        plan.points().len(),
        repeat.is_burning()
    );
    if !setup.is_empty() {
        harness.setup(&setup, pass.device.group())?;
    }

    let summary = harness.campaign(kind, &plan, &repeat, &mut Console)?;
    if let Some(msg) = closing_line(&repeat) {
        println!("{msg}");
    }
    println!("{}: {summary}", console::stamp());

    Ok(if !repeat.is_burning() && summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_regression(pass: &PassArgs, frames: usize) -> Result<ExitCode> {
    let cfg = RegressionConfig {
        dataflow_dir: pass.dataflow_dir.clone(),
        log_dir: pass.log_dir.clone(),
        group: pass.device.group(),
        frames,
    };
    let mut harness = pass.harness()?;
    run_campaign(pass, &mut harness, PassKind::Regression(&cfg))
}

fn cmd_performance(pass: &PassArgs, bench: BenchmarkConfig) -> Result<ExitCode> {
    let cfg = PerformanceConfig {
        dataflow_dir: pass.dataflow_dir.clone(),
        log_dir: pass.log_dir.clone(),
        group: pass.device.group(),
        bench,
    };
    let mut harness = pass.harness()?;
    run_campaign(pass, &mut harness, PassKind::Performance(&cfg))
}

fn cmd_report(log_dir: &Path) -> Result<ExitCode> {
    let cfg = PerformanceConfig {
        log_dir: log_dir.to_path_buf(),
        ..PerformanceConfig::default()
    };
    let result = cfg.ledger_path();
    if !result.is_file() {
        bail!("No performance ledger at {}", result.display());
    }
    let outcome = report::reduce(&result, &cfg.baseline_path(), &cfg.comparison_path())?;
    console::print_report(&outcome);
    Ok(ExitCode::SUCCESS)
}

fn cmd_info(device: &DeviceArgs) -> Result<ExitCode> {
    let host = HostInfo::collect();
    println!("OS           : {} ({})", host.os_name, host.os_version);
    println!("CPU          : {} x{}", host.cpu_name, host.logical_cpus);
    println!("Memory       : {} MB", host.total_memory_bytes / (1024 * 1024));

    let g = device.group();
    let dev = device.open()?;
    println!("Backend      : {}", dev.backend_type());
    match dev.identity(g) {
        Ok(id) => println!("Identity     : {id}"),
        Err(e) => println!("Identity     : (unavailable: {e})"),
    }
    match dev.operating_point(g) {
        Ok(op) => {
            println!("Frequency    : {:.0} MHz", op.frequency_mhz);
            println!("Voltage      : {:.0} mV", op.voltage_mv);
            println!("Thermal      : {:.0} °C", op.thermal_threshold_c);
        }
        Err(e) => println!("Operating pt : (unavailable: {e})"),
    }
    if let Ok(p) = dev.power_mw(g) {
        println!("Power        : {p:.1} mW");
    }
    if let Ok(t) = dev.temperature_c(g) {
        println!("Temperature  : {t:.1} °C");
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_shape(text: &str) -> Result<Shape> {
    let dims = text
        .split(',')
        .map(|d| d.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("bad shape {text:?}"))?;
    Ok(Shape::checked(dims)?)
}

#[allow(clippy::cast_precision_loss, clippy::too_many_arguments)]
fn cmd_make_testcase(
    root: &Path,
    name: &str,
    shape: &str,
    outputs: usize,
    frames: usize,
    scale: f32,
    bias: f32,
) -> Result<ExitCode> {
    if !mxa_harness::config::TESTCASE_PREFIXES.iter().any(|p| name.starts_with(p)) {
        bail!("{name} does not start with a recognized testcase prefix");
    }
    if outputs == 0 {
        bail!("a testcase needs at least one output port");
    }
    let shape = parse_shape(shape)?;
    let dir = root.join(name);

    let info = PackageInfo::new(
        vec![PortDescriptor::active(0, shape.clone(), PackingFormat::Fp32)],
        (0..outputs)
            .map(|i| PortDescriptor::active(i, shape.clone(), PackingFormat::Fp32))
            .collect(),
    );
    let transforms = (0..outputs)
        .map(|i| OutputTransform {
            source_input: 0,
            scale: scale * (i + 1) as f32,
            bias,
        })
        .collect::<Vec<_>>();
    let package = SoftwarePackage::new(info, transforms.clone())?;
    std::fs::create_dir_all(&dir)?;
    package.write_to(dir.join(PACKAGE_FILE))?;

    let n = shape.total_elements();
    for f in 0..frames {
        let input: Vec<f64> = (0..n).map(|j| (j as f64).mul_add(0.25, f as f64)).collect();
        fmap::save_text(&fmap::golden_input_path(&dir, 0, f), &input)?;
        for (port, t) in transforms.iter().enumerate() {
            let golden: Vec<f64> = input
                .iter()
                .map(|&x| f64::from(t.scale * x as f32 + t.bias))
                .collect();
            fmap::save_text(&fmap::golden_output_path(&dir, port, f), &golden)?;
        }
    }
    println!("Wrote {} ({outputs} outputs, {frames} frames, shape {shape})", dir.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timed_burns_announce_the_end() {
        assert_eq!(closing_line(&Repeat::For(Duration::from_secs(3600))), Some("time is up"));
        assert_eq!(closing_line(&Repeat::Forever), None);
        assert_eq!(closing_line(&Repeat::Once), None);
    }

    #[test]
    fn shape_parses_comma_list() {
        assert_eq!(parse_shape("1, 8").unwrap().dims, vec![1, 8]);
        assert!(parse_shape("1,x").is_err());
    }
}
