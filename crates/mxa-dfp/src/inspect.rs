//! Package inspection seam
//!
//! The evaluation engine never looks inside a compiled package itself; it asks
//! an inspector for the port table and decides from that which golden tensors
//! to load.

use crate::error::Result;
use crate::port::PackageInfo;
use std::path::Path;

/// Package inspection collaborator
///
/// Returns `Ok(None)` when the file exists but carries no usable metadata.
/// I/O failures are reported as errors.
pub trait PackageInspector: std::fmt::Debug + Send + Sync {
    /// Inspect the package at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the package cannot be read.
    fn inspect(&self, path: &Path) -> Result<Option<PackageInfo>>;
}

impl<T: PackageInspector + ?Sized> PackageInspector for Box<T> {
    fn inspect(&self, path: &Path) -> Result<Option<PackageInfo>> {
        (**self).inspect(path)
    }
}

impl<T: PackageInspector + ?Sized> PackageInspector for &T {
    fn inspect(&self, path: &Path) -> Result<Option<PackageInfo>> {
        (**self).inspect(path)
    }
}
