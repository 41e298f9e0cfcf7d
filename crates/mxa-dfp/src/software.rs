// SPDX-License-Identifier: AGPL-3.0-only

//! Software package format
//!
//! A compact binary package understood by the software accelerator. It carries
//! the same port table a compiled package exposes, plus one affine transform
//! per output port so the software accelerator can produce deterministic
//! outputs without a device.
//!
//! ## Layout (little-endian)
//!
//! ```text
//! magic "MXSW" | version u16 | n_inputs u16 | n_outputs u16
//! per port:    index u16 | active u8 | tag_len u8 | tag | rank u8 | dims u32 × rank
//! per output:  ... port ... | source_input u16 | scale f32 | bias f32
//! ```

use crate::error::{DfpError, Result};
use crate::inspect::PackageInspector;
use crate::port::{PackageInfo, PackingFormat, PortDescriptor};
use crate::shapes::Shape;
use bytes::{Buf, BufMut, BytesMut};
use std::path::Path;
use tracing::debug;

/// Magic bytes at the start of every software package
pub const SOFTWARE_MAGIC: [u8; 4] = *b"MXSW";

/// Current software package version
pub const SOFTWARE_VERSION: u16 = 1;

/// `output = scale * input[source_input][j % len] + bias`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputTransform {
    /// Input port index feeding this output
    pub source_input: usize,
    /// Multiplicative factor
    pub scale: f32,
    /// Additive offset
    pub bias: f32,
}

impl OutputTransform {
    /// Identity transform of the given input port
    pub const fn identity(source_input: usize) -> Self {
        Self {
            source_input,
            scale: 1.0,
            bias: 0.0,
        }
    }
}

/// Decoded software package
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwarePackage {
    /// Port table
    pub info: PackageInfo,
    /// One transform per entry of `info.output_ports`, same order
    pub transforms: Vec<OutputTransform>,
}

impl SoftwarePackage {
    /// Build a package, checking that every output has a transform
    ///
    /// # Errors
    ///
    /// Returns error if transform count differs from output count or a
    /// transform names an unknown input port.
    pub fn new(info: PackageInfo, transforms: Vec<OutputTransform>) -> Result<Self> {
        if transforms.len() != info.output_ports.len() {
            return Err(DfpError::invalid_port(format!(
                "{} transforms for {} output ports",
                transforms.len(),
                info.output_ports.len()
            )));
        }
        for t in &transforms {
            if !info.input_ports.iter().any(|p| p.index == t.source_input) {
                return Err(DfpError::invalid_port(format!(
                    "transform references unknown input port {}",
                    t.source_input
                )));
            }
        }
        Ok(Self { info, transforms })
    }

    /// Serialize to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(&SOFTWARE_MAGIC);
        buf.put_u16_le(SOFTWARE_VERSION);
        buf.put_u16_le(self.info.input_ports.len() as u16);
        buf.put_u16_le(self.info.output_ports.len() as u16);
        for port in &self.info.input_ports {
            put_port(&mut buf, port);
        }
        for (port, t) in self.info.output_ports.iter().zip(&self.transforms) {
            put_port(&mut buf, port);
            buf.put_u16_le(t.source_input as u16);
            buf.put_f32_le(t.scale);
            buf.put_f32_le(t.bias);
        }
        buf.to_vec()
    }

    /// Deserialize from bytes
    ///
    /// # Errors
    ///
    /// Returns error on bad magic, unknown version, or truncated data.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        need(data, 10, "header")?;
        let mut magic = [0u8; 4];
        data.copy_to_slice(&mut magic);
        if magic != SOFTWARE_MAGIC {
            return Err(DfpError::InvalidHeader {
                expected: SOFTWARE_MAGIC,
            });
        }
        let version = data.get_u16_le();
        if version != SOFTWARE_VERSION {
            return Err(DfpError::UnsupportedVersion { version });
        }
        let n_inputs = data.get_u16_le() as usize;
        let n_outputs = data.get_u16_le() as usize;

        let mut inputs = Vec::with_capacity(n_inputs);
        for _ in 0..n_inputs {
            inputs.push(get_port(&mut data)?);
        }
        let mut outputs = Vec::with_capacity(n_outputs);
        let mut transforms = Vec::with_capacity(n_outputs);
        for _ in 0..n_outputs {
            outputs.push(get_port(&mut data)?);
            need(data, 10, "output transform")?;
            transforms.push(OutputTransform {
                source_input: data.get_u16_le() as usize,
                scale: data.get_f32_le(),
                bias: data.get_f32_le(),
            });
        }
        if data.has_remaining() {
            return Err(DfpError::decode_error(format!(
                "{} trailing bytes",
                data.remaining()
            )));
        }

        // Keep transforms aligned with the sorted output table.
        let mut paired: Vec<_> = outputs.into_iter().zip(transforms).collect();
        paired.sort_by_key(|(p, _)| p.index);
        let (outputs, transforms): (Vec<_>, Vec<_>) = paired.into_iter().unzip();
        Self::new(PackageInfo::new(inputs, outputs), transforms)
    }

    /// Read and decode a package file
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or cannot be decoded.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DfpError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path)?;
        Self::decode(&data)
    }

    /// Encode and write to `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.encode())?;
        Ok(())
    }

    /// Transform for the output port with the given index
    pub fn transform_for(&self, output_index: usize) -> Option<&OutputTransform> {
        self.info
            .output_ports
            .iter()
            .position(|p| p.index == output_index)
            .and_then(|i| self.transforms.get(i))
    }
}

fn put_port(buf: &mut BytesMut, port: &PortDescriptor) {
    buf.put_u16_le(port.index as u16);
    buf.put_u8(u8::from(port.active));
    let tag = port.packing_format.tag().as_bytes();
    buf.put_u8(tag.len() as u8);
    buf.put_slice(tag);
    buf.put_u8(port.shape.rank() as u8);
    for &dim in &port.shape.dims {
        buf.put_u32_le(dim as u32);
    }
}

fn get_port(data: &mut &[u8]) -> Result<PortDescriptor> {
    need(data, 4, "port header")?;
    let index = data.get_u16_le() as usize;
    let active = data.get_u8() != 0;
    let tag_len = data.get_u8() as usize;
    need(data, tag_len + 1, "packing tag")?;
    let tag = String::from_utf8(data[..tag_len].to_vec())
        .map_err(|_| DfpError::decode_error("packing tag is not UTF-8"))?;
    data.advance(tag_len);
    let rank = data.get_u8() as usize;
    need(data, rank * 4, "shape")?;
    let dims = (0..rank).map(|_| data.get_u32_le() as usize).collect();
    Ok(PortDescriptor {
        index,
        active,
        shape: Shape::checked(dims)?,
        packing_format: PackingFormat::from_tag(&tag),
    })
}

fn need(data: &[u8], n: usize, what: &str) -> Result<()> {
    if data.remaining() < n {
        return Err(DfpError::decode_error(format!(
            "truncated {what}: need {n} bytes, have {}",
            data.remaining()
        )));
    }
    Ok(())
}

/// Inspector for software packages
///
/// Files that do not start with [`SOFTWARE_MAGIC`] yield no metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareInspector;

impl PackageInspector for SoftwareInspector {
    fn inspect(&self, path: &Path) -> Result<Option<PackageInfo>> {
        let data = std::fs::read(path)?;
        if !data.starts_with(&SOFTWARE_MAGIC) {
            debug!("{}: not a software package", path.display());
            return Ok(None);
        }
        Ok(Some(SoftwarePackage::decode(&data)?.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn two_output_package() -> SoftwarePackage {
        let info = PackageInfo::new(
            vec![PortDescriptor::active(0, Shape::new(vec![4, 4, 3]), PackingFormat::Rgb888)],
            vec![
                PortDescriptor::active(1, Shape::new(vec![10]), PackingFormat::Fp32),
                PortDescriptor::active(0, Shape::new(vec![2, 2]), PackingFormat::Bf16),
            ],
        );
        SoftwarePackage::new(
            info,
            vec![
                OutputTransform { source_input: 0, scale: 0.5, bias: 1.0 },
                OutputTransform::identity(0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn decode_restores_port_table() {
        let pkg = two_output_package();
        let decoded = SoftwarePackage::decode(&pkg.encode()).unwrap();
        assert_eq!(decoded.info, pkg.info);
        assert_eq!(decoded.transforms, pkg.transforms);
        assert_eq!(decoded.transform_for(0).unwrap().scale, 0.5);
    }

    #[test]
    fn truncated_package_is_an_error() {
        let bytes = two_output_package().encode();
        let err = SoftwarePackage::decode(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, DfpError::DecodeError { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let err = SoftwarePackage::decode(b"NOPE\x01\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, DfpError::InvalidHeader { .. }));
    }

    #[test]
    fn transform_must_reference_known_input() {
        let info = PackageInfo::new(
            vec![PortDescriptor::active(0, Shape::new(vec![4]), PackingFormat::Fp32)],
            vec![PortDescriptor::active(0, Shape::new(vec![4]), PackingFormat::Fp32)],
        );
        assert!(SoftwarePackage::new(info, vec![OutputTransform::identity(3)]).is_err());
    }

    #[test]
    fn inspector_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.dfp");
        two_output_package().write_to(&path).unwrap();

        let info = SoftwareInspector.inspect(&path).unwrap().unwrap();
        assert_eq!(info.input_ports.len(), 1);
        assert_eq!(info.output_ports.len(), 2);
    }

    #[test]
    fn inspector_returns_none_for_foreign_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.dfp");
        std::fs::write(&path, b"compiled-by-someone-else").unwrap();
        assert!(SoftwareInspector.inspect(&path).unwrap().is_none());
    }

    #[test]
    fn missing_file_reports_not_found() {
        let err = SoftwarePackage::from_file("/nonexistent/model.dfp").unwrap_err();
        assert!(matches!(err, DfpError::FileNotFound { .. }));
    }
}
