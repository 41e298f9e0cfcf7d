//! Port descriptors reported by package inspection
//!
//! A compiled package exposes two independent, ordered port collections:
//! input ports (ifmaps) and output ports (ofmaps). Each port declares its
//! tensor shape, whether it is active, and the packing format the device
//! expects on the wire. The packing format decides the host element type.

use crate::shapes::Shape;

/// Host-side element type of a port's tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unsigned byte (image-like inputs)
    U8,
    /// 32-bit float
    F32,
}

/// Packing format tag of a port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackingFormat {
    /// 8-bit RGB pixels; the only format carried as unsigned bytes
    Rgb888,
    /// bfloat16 on the wire
    Bf16,
    /// Group block float (80-bit groups)
    Gbf80,
    /// IEEE-754 single precision
    Fp32,
    /// Any other tag the compiler emits
    Other(String),
}

impl PackingFormat {
    /// Parse a packing format tag (case-insensitive)
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rgb888" => Self::Rgb888,
            "bf16" => Self::Bf16,
            "gbf80" => Self::Gbf80,
            "fp32" | "float32" => Self::Fp32,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    /// Canonical tag string
    pub fn tag(&self) -> &str {
        match self {
            Self::Rgb888 => "rgb888",
            Self::Bf16 => "bf16",
            Self::Gbf80 => "gbf80",
            Self::Fp32 => "fp32",
            Self::Other(tag) => tag,
        }
    }

    /// Host element type used for tensors of this format
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Rgb888 => ElementType::U8,
            _ => ElementType::F32,
        }
    }
}

impl std::fmt::Display for PackingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One input or output port of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Port index within its direction; also names the golden tensor files
    pub index: usize,

    /// Inactive ports are skipped entirely
    pub active: bool,

    /// Declared tensor shape for a single frame
    pub shape: Shape,

    /// Packing format on the wire
    pub packing_format: PackingFormat,
}

impl PortDescriptor {
    /// Create an active port
    pub fn active(index: usize, shape: Shape, packing_format: PackingFormat) -> Self {
        Self {
            index,
            active: true,
            shape,
            packing_format,
        }
    }

    /// Host element type of this port
    pub const fn element_type(&self) -> ElementType {
        self.packing_format.element_type()
    }
}

/// Structured metadata returned by package inspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    /// Input ports ordered by index
    pub input_ports: Vec<PortDescriptor>,

    /// Output ports ordered by index
    pub output_ports: Vec<PortDescriptor>,
}

impl PackageInfo {
    /// Create package info, sorting both collections by port index
    pub fn new(mut input_ports: Vec<PortDescriptor>, mut output_ports: Vec<PortDescriptor>) -> Self {
        input_ports.sort_by_key(|p| p.index);
        output_ports.sort_by_key(|p| p.index);
        Self {
            input_ports,
            output_ports,
        }
    }

    /// Active input ports in index order
    pub fn active_inputs(&self) -> impl Iterator<Item = &PortDescriptor> {
        self.input_ports.iter().filter(|p| p.active)
    }

    /// Active output ports in index order
    pub fn active_outputs(&self) -> impl Iterator<Item = &PortDescriptor> {
        self.output_ports.iter().filter(|p| p.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb888_selects_u8() {
        assert_eq!(PackingFormat::from_tag("rgb888").element_type(), ElementType::U8);
        assert_eq!(PackingFormat::from_tag("RGB888 ").element_type(), ElementType::U8);
    }

    #[test]
    fn test_other_formats_select_f32() {
        for tag in ["bf16", "gbf80", "fp32", "yuv422"] {
            assert_eq!(
                PackingFormat::from_tag(tag).element_type(),
                ElementType::F32,
                "{tag} should map to f32"
            );
        }
        assert_eq!(PackingFormat::from_tag("yuv422").tag(), "yuv422");
    }

    #[test]
    fn test_active_filters_skip_inactive_ports() {
        let shape = Shape::new(vec![4]);
        let mut idle = PortDescriptor::active(1, shape.clone(), PackingFormat::Fp32);
        idle.active = false;
        let info = PackageInfo::new(
            vec![idle, PortDescriptor::active(0, shape.clone(), PackingFormat::Rgb888)],
            vec![PortDescriptor::active(0, shape, PackingFormat::Gbf80)],
        );
        let active: Vec<usize> = info.active_inputs().map(|p| p.index).collect();
        assert_eq!(active, vec![0]);
        assert_eq!(info.input_ports[1].index, 1);
        assert_eq!(info.active_outputs().count(), 1);
    }
}
