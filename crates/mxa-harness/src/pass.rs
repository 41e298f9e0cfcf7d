//! Regression and performance passes
//!
//! A pass walks the located testcases once, gated by the ledger. A campaign
//! wraps passes in the repeat dimension (outermost) and the sweep (inner).
//! The device is singly owned, so testcases run strictly one after another.
//!
//! The harness never prints. Console output is the job of a [`Progress`]
//! observer supplied by the caller.

use crate::bench::BenchmarkRunner;
use crate::compare::GoldenComparator;
use crate::config::{PerformanceConfig, RegressionConfig, TESTCASE_PREFIXES};
use crate::error::{HarnessError, Result};
use crate::host::HostInfo;
use crate::ledger::{Ledger, LedgerColumns, LedgerMode};
use crate::locator::{locate, Ordering, Testcase};
use crate::measurement::{MeasurementLog, MeasurementRecord};
use crate::outcome::{Outcome, RunResult};
use crate::report::{self, ReportOutcome};
use crate::sweep::{Repeat, Setup, SweepPlan, SweepPoint};
use mxa_dfp::PackageInspector;
use mxa_driver::{Accelerator, DeviceAccess, DeviceGroup, DeviceIdentity, OperatingPoint};
use tracing::{error, info, warn};

/// Tally of one or more passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Testcases that produced a ledger row
    pub evaluated: usize,
    /// Testcases skipped because the ledger already had them
    pub skipped: usize,
    /// PASS rows
    pub passed: usize,
    /// Non-PASS rows
    pub failed: usize,
    /// Testcases aborted by an infrastructure error, no row written
    pub errored: usize,
}

impl PassSummary {
    /// True when any testcase failed or errored
    pub const fn has_failures(&self) -> bool {
        self.failed > 0 || self.errored > 0
    }

    /// Add another tally into this one
    pub fn merge(&mut self, other: &Self) {
        self.evaluated += other.evaluated;
        self.skipped += other.skipped;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errored += other.errored;
    }

    fn record(&mut self, result: &RunResult) {
        self.evaluated += 1;
        if result.is_pass() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl std::fmt::Display for PassSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} evaluated, {} passed, {} failed, {} errored, {} skipped",
            self.evaluated, self.passed, self.failed, self.errored, self.skipped
        )
    }
}

/// How a single pass treats the ledger and device errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassMode {
    /// Ledger open mode
    pub ledger: LedgerMode,
    /// Burning passes never abort on a device error and skip the report
    pub burning: bool,
}

impl PassMode {
    /// Single resumable pass
    pub const fn single() -> Self {
        Self {
            ledger: LedgerMode::Resume,
            burning: false,
        }
    }
}

/// Which pass a campaign repeats
#[derive(Debug, Clone, Copy)]
pub enum PassKind<'a> {
    /// Golden comparison
    Regression(&'a RegressionConfig),
    /// Throughput with telemetry
    Performance(&'a PerformanceConfig),
}

impl PassKind<'_> {
    const fn group(&self) -> DeviceGroup {
        match self {
            Self::Regression(cfg) => cfg.group,
            Self::Performance(cfg) => cfg.group,
        }
    }
}

/// Observer for pass progress; every method defaults to doing nothing
#[allow(unused_variables)]
pub trait Progress {
    /// A burning round starts
    fn round(&mut self, round: u64) {}
    /// A sweep point was applied
    fn sweep_point(&mut self, point: &SweepPoint) {}
    /// Testcase already in the ledger
    fn skipped(&mut self, testcase: &Testcase) {}
    /// Testcase about to run
    fn running(&mut self, testcase: &Testcase) {}
    /// Testcase produced a result
    fn finished(&mut self, result: &RunResult) {}
    /// Testcase aborted by an infrastructure error
    fn errored(&mut self, testcase: &Testcase, error: &HarnessError) {}
    /// Performance report reduced
    fn report(&mut self, outcome: &ReportOutcome) {}
    /// Pass complete
    fn pass_finished(&mut self, summary: &PassSummary) {}
}

/// Progress observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Progress for Silent {}

/// Evaluation engine bound to one accelerator and one device
pub struct Harness {
    accelerator: Box<dyn Accelerator>,
    inspector: Box<dyn PackageInspector>,
    device: Box<dyn DeviceAccess>,
    measurements: Option<MeasurementLog>,
    host: HostInfo,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("accelerator", &self.accelerator)
            .field("inspector", &self.inspector)
            .field("device", &self.device.backend_type())
            .field("measurements", &self.measurements)
            .finish_non_exhaustive()
    }
}

/// Device facts read once at pass start
struct DeviceSnapshot {
    operating_point: Option<OperatingPoint>,
    identity: DeviceIdentity,
}

impl DeviceSnapshot {
    fn columns(&self, base: LedgerColumns) -> LedgerColumns {
        base.with_operating_point(self.operating_point.is_some())
    }

    fn read<D: DeviceAccess + ?Sized>(device: &D, group: DeviceGroup) -> Self {
        let operating_point = match device.operating_point(group) {
            Ok(op) => Some(op),
            Err(e) => {
                warn!("{group} operating point unavailable: {e}");
                None
            }
        };
        let identity = device.identity(group).unwrap_or_else(|e| {
            warn!("{group} identity unavailable: {e}");
            DeviceIdentity::default()
        });
        Self {
            operating_point,
            identity,
        }
    }
}

fn record_measurement(
    log: &mut Option<MeasurementLog>,
    host: &HostInfo,
    identity: &DeviceIdentity,
    result: &RunResult,
) {
    if let Some(log) = log {
        if let Err(e) = log.record(&MeasurementRecord::new(host, identity, result)) {
            warn!("measurement log {}: {e}", log.path().display());
        }
    }
}

impl Harness {
    /// Create a harness without a measurement log
    pub fn new(
        accelerator: Box<dyn Accelerator>,
        inspector: Box<dyn PackageInspector>,
        device: Box<dyn DeviceAccess>,
    ) -> Self {
        Self {
            accelerator,
            inspector,
            device,
            measurements: None,
            host: HostInfo::collect(),
        }
    }

    /// Append every result to `log`
    #[must_use]
    pub fn with_measurement_log(mut self, log: MeasurementLog) -> Self {
        self.measurements = Some(log);
        self
    }

    /// Device telemetry and control
    pub fn device(&self) -> &dyn DeviceAccess {
        &*self.device
    }

    /// Host facts recorded with measurements
    pub const fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Run one regression pass
    ///
    /// Testcases run in name order. Golden-load failures and other
    /// infrastructure errors are tallied as errored and leave no row.
    ///
    /// # Errors
    ///
    /// Returns error if the dataflow dir cannot be listed or the ledger
    /// cannot be written.
    pub fn regression_pass(
        &mut self,
        cfg: &RegressionConfig,
        mode: PassMode,
        progress: &mut dyn Progress,
    ) -> Result<PassSummary> {
        let testcases = locate(&cfg.dataflow_dir, &TESTCASE_PREFIXES, Ordering::Sorted)?;
        let snapshot = DeviceSnapshot::read(&*self.device, cfg.group);
        let columns = snapshot.columns(LedgerColumns::BASIC);
        let mut ledger = Ledger::open(cfg.ledger_path(), mode.ledger, columns)?;
        let comparator = GoldenComparator::new(&*self.inspector, cfg.frames);
        let mut summary = PassSummary::default();

        info!(
            "regression: {} testcases under {}, {} in ledger",
            testcases.len(),
            cfg.dataflow_dir.display(),
            ledger.evaluated_count()
        );
        for tc in &testcases {
            if ledger.is_evaluated(&tc.name) {
                summary.skipped += 1;
                progress.skipped(tc);
                continue;
            }
            progress.running(tc);

            match comparator.evaluate(tc, &mut *self.accelerator) {
                Ok(result) => {
                    let result = result.with_operating_point(snapshot.operating_point);
                    ledger.append(&result)?;
                    record_measurement(&mut self.measurements, &self.host, &snapshot.identity, &result);
                    summary.record(&result);
                    progress.finished(&result);
                }
                Err(e) => {
                    error!("{}: {e}", tc.name);
                    summary.errored += 1;
                    progress.errored(tc, &e);
                }
            }
        }

        info!("regression: {summary}");
        progress.pass_finished(&summary);
        Ok(summary)
    }

    /// Run one performance pass
    ///
    /// Testcases run in discovery order. A non-burning pass ends with the
    /// baseline report.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be written, or on a device error
    /// outside burning mode.
    pub fn performance_pass(
        &mut self,
        cfg: &PerformanceConfig,
        mode: PassMode,
        progress: &mut dyn Progress,
    ) -> Result<PassSummary> {
        let testcases = locate(&cfg.dataflow_dir, &TESTCASE_PREFIXES, Ordering::Discovery)?;
        let ledger_path = cfg.ledger_path();
        let snapshot = DeviceSnapshot::read(&*self.device, cfg.group);
        let columns = snapshot.columns(LedgerColumns::WITH_TELEMETRY);
        let mut ledger = Ledger::open(&ledger_path, mode.ledger, columns)?;
        let runner = BenchmarkRunner::new(cfg.bench, cfg.group);
        let mut summary = PassSummary::default();

        info!(
            "performance: {} testcases under {}, {} in ledger, {} frames x {}",
            testcases.len(),
            cfg.dataflow_dir.display(),
            ledger.evaluated_count(),
            cfg.bench.frames,
            cfg.bench.loop_average
        );
        for tc in &testcases {
            if ledger.is_evaluated(&tc.name) {
                summary.skipped += 1;
                progress.skipped(tc);
                continue;
            }
            progress.running(tc);

            let package = tc.package_path();
            let result = if package.is_file() {
                match runner.run(&mut *self.accelerator, &*self.device, &package) {
                    Ok(report) if report.is_complete() => RunResult::passed(&tc.name, report.fps)
                        .with_telemetry(report.telemetry),
                    Ok(_) => {
                        let e = HarnessError::worker_failed("run ended without the throughput signal");
                        warn!("{}: {e}", tc.name);
                        summary.errored += 1;
                        progress.errored(tc, &e);
                        continue;
                    }
                    Err(e) if mode.burning => {
                        error!("{}: {e}", tc.name);
                        summary.errored += 1;
                        progress.errored(tc, &e);
                        continue;
                    }
                    Err(e) => {
                        error!("{}: {e}, aborting pass", tc.name);
                        progress.errored(tc, &e);
                        return Err(e);
                    }
                }
            } else {
                RunResult::failed(&tc.name, Outcome::DfpMissing)
            };

            let result = result.with_operating_point(snapshot.operating_point);
            ledger.append(&result)?;
            record_measurement(&mut self.measurements, &self.host, &snapshot.identity, &result);
            summary.record(&result);
            progress.finished(&result);
        }
        drop(ledger);

        info!("performance: {summary}");
        if !mode.burning {
            let outcome = report::reduce(&ledger_path, &cfg.baseline_path(), &cfg.comparison_path())?;
            progress.report(&outcome);
        }
        progress.pass_finished(&summary);
        Ok(summary)
    }

    /// Apply fixed settings once, before any pass
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects a setting.
    pub fn setup(&self, setup: &Setup, group: DeviceGroup) -> Result<()> {
        setup.apply(&*self.device, group)
    }

    /// Run passes over every repeat round and sweep point
    ///
    /// Single-point non-burning campaigns resume from the ledger. Burning
    /// rounds and multi-point sweeps start with a fresh ledger at their
    /// first point; later points append their rows to it.
    ///
    /// # Errors
    ///
    /// Returns error if a sweep point cannot be applied or a pass aborts.
    pub fn campaign(
        &mut self,
        kind: PassKind<'_>,
        plan: &SweepPlan,
        repeat: &Repeat,
        progress: &mut dyn Progress,
    ) -> Result<PassSummary> {
        let burning = repeat.is_burning();
        let points = plan.points();
        let first = if burning || points.len() > 1 {
            LedgerMode::Fresh
        } else {
            LedgerMode::Resume
        };
        let group = kind.group();
        let mut total = PassSummary::default();

        for round in repeat.rounds() {
            if burning {
                info!("round {round}");
                progress.round(round);
            }
            for (i, point) in points.iter().enumerate() {
                let mode = PassMode {
                    ledger: if i == 0 { first } else { LedgerMode::Append },
                    burning,
                };
                if plan.is_active() {
                    point.apply(&*self.device, group)?;
                    progress.sweep_point(point);
                }
                let summary = match kind {
                    PassKind::Regression(cfg) => self.regression_pass(cfg, mode, progress)?,
                    PassKind::Performance(cfg) => self.performance_pass(cfg, mode, progress)?,
                };
                total.merge(&summary);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_merges_and_flags_failures() {
        let mut total = PassSummary::default();
        assert!(!total.has_failures());

        let mut one = PassSummary::default();
        one.record(&RunResult::passed("a", 1.0));
        one.record(&RunResult::failed("b", Outcome::CompareFailed));
        total.merge(&one);
        total.merge(&PassSummary { skipped: 3, errored: 1, ..PassSummary::default() });

        assert_eq!(total.evaluated, 2);
        assert_eq!(total.passed, 1);
        assert_eq!(total.failed, 1);
        assert_eq!(total.skipped, 3);
        assert_eq!(total.errored, 1);
        assert!(total.has_failures());
        assert_eq!(
            total.to_string(),
            "2 evaluated, 1 passed, 1 failed, 1 errored, 3 skipped"
        );
    }

    #[test]
    fn errored_alone_counts_as_failure() {
        let s = PassSummary { errored: 1, ..PassSummary::default() };
        assert!(s.has_failures());
    }
}
