//! Error types for dataflow package inspection

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for package operations
pub type Result<T> = std::result::Result<T, DfpError>;

/// Errors that can occur while inspecting or decoding a package
#[derive(Debug, Error)]
pub enum DfpError {
    /// Package file not found or cannot be read
    #[error("Package file not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Package does not start with the expected magic bytes
    #[error("Invalid package header: expected magic {expected:?}")]
    InvalidHeader {
        /// Expected magic bytes
        expected: [u8; 4],
    },

    /// Unsupported package format version
    #[error("Unsupported package version: {version}")]
    UnsupportedVersion {
        /// Version found in the package
        version: u16,
    },

    /// Package decoding failed
    #[error("Failed to decode package: {reason}")]
    DecodeError {
        /// Reason for failure
        reason: String,
    },

    /// Invalid port description
    #[error("Invalid port: {reason}")]
    InvalidPort {
        /// Reason for failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl DfpError {
    /// Create a decode error
    pub fn decode_error(reason: impl Into<String>) -> Self {
        Self::DecodeError {
            reason: reason.into(),
        }
    }

    /// Create an invalid port error
    pub fn invalid_port(reason: impl Into<String>) -> Self {
        Self::InvalidPort {
            reason: reason.into(),
        }
    }
}
