//! Host tensors exchanged with the accelerator
//!
//! Tensors are dense, row-major, and typed by the port's packing format:
//! `rgb888` ports carry bytes, everything else carries `f32`. Multi-frame
//! tensors stack frames along the outermost axis.

use crate::error::{MxaError, Result};
use mxa_dfp::{ElementType, Shape};

/// Typed element storage
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Unsigned bytes
    U8(Vec<u8>),
    /// Single precision floats
    F32(Vec<f32>),
}

impl TensorData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the storage
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::F32(_) => ElementType::F32,
        }
    }
}

/// Dense tensor with a shape
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor, checking the element count against the shape
    ///
    /// # Errors
    ///
    /// Returns error if `data.len()` differs from the shape's element count.
    pub fn new(shape: Shape, data: TensorData) -> Result<Self> {
        if shape.total_elements() != data.len() {
            return Err(MxaError::invalid_tensor(format!(
                "shape {shape} needs {} elements, got {}",
                shape.total_elements(),
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Build from `f64` values, casting to the requested element type
    ///
    /// Byte casts saturate to `0..=255` and drop the fraction.
    ///
    /// # Errors
    ///
    /// Returns error if the value count differs from the shape's element count.
    pub fn from_f64(shape: Shape, values: &[f64], element_type: ElementType) -> Result<Self> {
        let data = match element_type {
            #[allow(clippy::cast_sign_loss)]
            ElementType::U8 => TensorData::U8(values.iter().map(|&v| v as u8).collect()),
            ElementType::F32 => TensorData::F32(values.iter().map(|&v| v as f32).collect()),
        };
        Self::new(shape, data)
    }

    /// Zero-filled tensor
    pub fn zeros(shape: Shape, element_type: ElementType) -> Self {
        let n = shape.total_elements();
        let data = match element_type {
            ElementType::U8 => TensorData::U8(vec![0; n]),
            ElementType::F32 => TensorData::F32(vec![0.0; n]),
        };
        Self { shape, data }
    }

    /// Tensor shape
    pub const fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element storage
    pub const fn data(&self) -> &TensorData {
        &self.data
    }

    /// Element type
    pub const fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the outermost axis (0 for a scalar shape)
    pub fn frames(&self) -> usize {
        self.shape.dims.first().copied().unwrap_or(0)
    }

    /// Slice out one frame along the outermost axis
    pub fn frame(&self, index: usize) -> Option<Self> {
        let (&count, inner) = self.shape.dims.split_first()?;
        if index >= count {
            return None;
        }
        let shape = Shape::new(inner.to_vec());
        let n = shape.total_elements();
        let range = index * n..(index + 1) * n;
        let data = match &self.data {
            TensorData::U8(v) => TensorData::U8(v.get(range)?.to_vec()),
            TensorData::F32(v) => TensorData::F32(v.get(range)?.to_vec()),
        };
        Some(Self { shape, data })
    }

    /// Widen all elements to `f64`
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.data {
            TensorData::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }

    /// Stack same-shaped tensors along a new outermost axis
    ///
    /// # Errors
    ///
    /// Returns error if `frames` is empty or shapes/element types differ.
    pub fn stack(frames: &[Self]) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| MxaError::invalid_tensor("cannot stack zero frames"))?;
        let shape = first.shape.with_frames(frames.len());
        let mut data = match first.element_type() {
            ElementType::U8 => TensorData::U8(Vec::with_capacity(shape.total_elements())),
            ElementType::F32 => TensorData::F32(Vec::with_capacity(shape.total_elements())),
        };
        for frame in frames {
            if frame.shape != first.shape {
                return Err(MxaError::invalid_tensor(format!(
                    "cannot stack {} with {}",
                    frame.shape, first.shape
                )));
            }
            match (&mut data, &frame.data) {
                (TensorData::U8(out), TensorData::U8(v)) => out.extend_from_slice(v),
                (TensorData::F32(out), TensorData::F32(v)) => out.extend_from_slice(v),
                _ => return Err(MxaError::invalid_tensor("mixed element types")),
            }
        }
        Ok(Self { shape, data })
    }
}
