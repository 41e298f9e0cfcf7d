//! Pass configuration and fixed file names

use mxa_driver::DeviceGroup;
use std::path::PathBuf;
use std::time::Duration;

/// Recognized testcase directory prefixes, in discovery order
pub const TESTCASE_PREFIXES: [&str; 6] = ["k", "onnx_", "pt_", "tf_", "tfl_", "model_"];

/// Compiled package file inside every testcase directory
pub const PACKAGE_FILE: &str = "model.dfp";

/// Regression ledger file name
pub const REGRESSION_LEDGER: &str = "regression_result.csv";

/// Performance ledger file name
pub const PERFORMANCE_LEDGER: &str = "performance_result.csv";

/// Stored performance baseline (spelling kept for existing log directories)
pub const BASELINE_FILE: &str = "performance_gloden.csv";

/// Comparison report file name
pub const COMPARISON_FILE: &str = "performance_compare.csv";

/// Regression pass configuration
#[derive(Debug, Clone)]
pub struct RegressionConfig {
    /// Root holding testcase directories
    pub dataflow_dir: PathBuf,
    /// Directory for the ledger
    pub log_dir: PathBuf,
    /// Device group under test
    pub group: DeviceGroup,
    /// Golden frames per port
    pub frames: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            dataflow_dir: PathBuf::from("dfp"),
            log_dir: PathBuf::from("log"),
            group: DeviceGroup(0),
            frames: 2,
        }
    }
}

impl RegressionConfig {
    /// Ledger path
    pub fn ledger_path(&self) -> PathBuf {
        self.log_dir.join(REGRESSION_LEDGER)
    }
}

/// Benchmark runner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Frames per invocation
    pub frames: u32,
    /// Invocations averaged per testcase
    pub loop_average: u32,
    /// Sampling interval
    pub interval: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            frames: 100,
            loop_average: 1,
            interval: Duration::from_millis(1),
        }
    }
}

/// Performance pass configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// Root holding testcase directories
    pub dataflow_dir: PathBuf,
    /// Directory for the ledger, baseline and comparison report
    pub log_dir: PathBuf,
    /// Device group under test
    pub group: DeviceGroup,
    /// Benchmark runner settings
    pub bench: BenchmarkConfig,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            dataflow_dir: PathBuf::from("dfp"),
            log_dir: PathBuf::from("log"),
            group: DeviceGroup(0),
            bench: BenchmarkConfig::default(),
        }
    }
}

impl PerformanceConfig {
    /// Ledger path
    pub fn ledger_path(&self) -> PathBuf {
        self.log_dir.join(PERFORMANCE_LEDGER)
    }

    /// Baseline path
    pub fn baseline_path(&self) -> PathBuf {
        self.log_dir.join(BASELINE_FILE)
    }

    /// Comparison report path
    pub fn comparison_path(&self) -> PathBuf {
        self.log_dir.join(COMPARISON_FILE)
    }
}
