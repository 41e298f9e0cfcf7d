//! Regression and performance evaluation engine for MX accelerators.
//!
//! Discovers testcase directories, gates them through a resumable ledger,
//! compares device outputs against golden tensors, benchmarks throughput
//! while sampling telemetry, sweeps the operating point and reduces
//! performance results against a stored baseline.
//!
//! ```text
//! locate ─► Ledger gate ─► GoldenComparator / BenchmarkRunner ─► Ledger row
//!    ▲                                                               │
//!    └──── SweepPlan × Repeat (campaign) ◄───────────────────────────┘
//!                                              report::reduce ◄──────┘
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use mxa_dfp::SoftwareInspector;
//! use mxa_driver::{SoftwareAccelerator, SoftwareTelemetry};
//! use mxa_harness::{Harness, PassKind, RegressionConfig, Repeat, Silent, SweepPlan};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut harness = Harness::new(
//!     Box::new(SoftwareAccelerator::new()),
//!     Box::new(SoftwareInspector),
//!     Box::new(SoftwareTelemetry::new()),
//! );
//! let cfg = RegressionConfig::default();
//! let summary = harness.campaign(
//!     PassKind::Regression(&cfg),
//!     &SweepPlan::default(),
//!     &Repeat::Once,
//!     &mut Silent,
//! )?;
//! println!("{summary}");
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

pub mod bench;
pub mod compare;
pub mod config;
mod error;
pub mod fmap;
pub mod host;
pub mod ledger;
pub mod locator;
pub mod measurement;
mod outcome;
pub mod pass;
pub mod report;
pub mod sweep;

pub use bench::{BenchmarkReport, BenchmarkRunner};
pub use compare::GoldenComparator;
pub use config::{BenchmarkConfig, PerformanceConfig, RegressionConfig};
pub use error::{HarnessError, Result};
pub use host::HostInfo;
pub use ledger::{Ledger, LedgerMode};
pub use locator::{locate, Testcase};
pub use measurement::{MeasurementLog, MeasurementRecord};
pub use outcome::{Outcome, RunResult, TelemetryAverages};
pub use pass::{Harness, PassKind, PassMode, PassSummary, Progress, Silent};
pub use report::{ReportOutcome, Verdict};
pub use sweep::{Repeat, Setup, SweepAxis, SweepPlan, SweepPoint};
