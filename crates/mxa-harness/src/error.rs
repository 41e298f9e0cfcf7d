//! Error types for the evaluation engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Infrastructure errors
///
/// Testcase classifications are never errors; see [`crate::Outcome`].
#[derive(Debug, Error)]
pub enum HarnessError {
    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// CSV ledger or report error
    #[error("CSV error: {source}")]
    Csv {
        /// Underlying CSV error
        #[from]
        source: csv::Error,
    },

    /// Measurement log serialization error
    #[error("JSON error: {source}")]
    Json {
        /// Underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Accelerator or telemetry error
    #[error("Device error: {source}")]
    Device {
        /// Underlying driver error
        #[from]
        source: mxa_driver::MxaError,
    },

    /// Package inspection error
    #[error("Package error: {source}")]
    Package {
        /// Underlying package error
        #[from]
        source: mxa_dfp::DfpError,
    },

    /// Golden tensor file could not be parsed
    #[error("Bad golden tensor {path}: {reason}")]
    GoldenParse {
        /// Tensor file
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Golden tensor element count does not fit the port shape
    #[error("Golden tensor {path} has {found} values, port shape needs {expected}")]
    GoldenShape {
        /// Tensor file
        path: PathBuf,
        /// Elements required by the port shape
        expected: usize,
        /// Elements found in the file
        found: usize,
    },

    /// Invalid sweep range
    #[error("Invalid sweep: {reason}")]
    InvalidSweep {
        /// Reason for failure
        reason: String,
    },

    /// Benchmark worker died before handing back its result
    #[error("Benchmark worker failed: {reason}")]
    WorkerFailed {
        /// Reason for failure
        reason: String,
    },
}

impl HarnessError {
    /// Create a golden parse error
    pub fn golden_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::GoldenParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid sweep error
    pub fn invalid_sweep(reason: impl Into<String>) -> Self {
        Self::InvalidSweep {
            reason: reason.into(),
        }
    }

    /// Create a worker failed error
    pub fn worker_failed(reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            reason: reason.into(),
        }
    }
}
