#![deny(unsafe_code)]

//! Dataflow package inspection
//!
//! The validation harness treats compiled model artifacts ("dataflow
//! packages") as opaque. All it needs is the port table: which input and
//! output ports exist, which are active, their shapes and packing formats.
//! This crate defines that metadata, the [`PackageInspector`] seam, and a
//! small software package format used to drive the harness without a device.
//!
//! # Example
//!
//! ```no_run
//! use mxa_dfp::{PackageInspector, SoftwareInspector};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(info) = SoftwareInspector.inspect(Path::new("dfp/k_resnet/model.dfp"))? {
//!     for port in info.active_inputs() {
//!         println!("ifmap {}: {} {}", port.index, port.shape, port.packing_format);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

mod error;
mod inspect;
mod port;
mod shapes;
pub mod software;

pub use error::{DfpError, Result};
pub use inspect::PackageInspector;
pub use port::{ElementType, PackageInfo, PackingFormat, PortDescriptor};
pub use shapes::Shape;
pub use software::{OutputTransform, SoftwareInspector, SoftwarePackage};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ElementType, PackageInfo, PackageInspector, PackingFormat, PortDescriptor, Result, Shape,
    };
}
