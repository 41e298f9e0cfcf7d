//! Error types for accelerator and telemetry operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, MxaError>;

/// Errors that can occur while driving the accelerator or reading telemetry
#[derive(Debug, Error)]
pub enum MxaError {
    /// Device group has no sysfs node
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// A telemetry or control attribute is missing
    #[error("Attribute unavailable: {path}")]
    AttributeUnavailable {
        /// Attribute path
        path: PathBuf,
    },

    /// Attribute content could not be parsed
    #[error("Cannot parse {path}: {value:?}")]
    ParseFailed {
        /// Attribute path
        path: PathBuf,
        /// Raw content
        value: String,
    },

    /// I/O error during device communication
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Package could not be loaded
    #[error("Package error: {source}")]
    Package {
        /// Underlying package error
        #[from]
        source: mxa_dfp::DfpError,
    },

    /// Inference run failed on the device
    #[error("Run failed: {reason}")]
    RunFailed {
        /// Reason for failure
        reason: String,
    },

    /// Tensor data does not match its shape or element type
    #[error("Invalid tensor: {reason}")]
    InvalidTensor {
        /// Reason for failure
        reason: String,
    },

    /// Device is in an invalid state
    #[error("Device in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },
}

impl MxaError {
    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create an attribute unavailable error
    pub fn attribute_unavailable(path: impl Into<PathBuf>) -> Self {
        Self::AttributeUnavailable { path: path.into() }
    }

    /// Create a run failed error
    pub fn run_failed(reason: impl Into<String>) -> Self {
        Self::RunFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid tensor error
    pub fn invalid_tensor(reason: impl Into<String>) -> Self {
        Self::InvalidTensor {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }
}
