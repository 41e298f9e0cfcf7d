//! Tensor shapes declared by package ports

use crate::error::{DfpError, Result};

/// Tensor shape (dimensions), every dimension strictly positive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Dimensions (e.g., [height, width, z, channels])
    pub dims: Vec<usize>,
}

impl Shape {
    /// Create new shape without validation
    pub const fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Create a shape, rejecting zero-sized dimensions
    ///
    /// # Errors
    ///
    /// Returns error if any dimension is zero.
    pub fn checked(dims: Vec<usize>) -> Result<Self> {
        if dims.contains(&0) {
            return Err(DfpError::invalid_port(format!(
                "shape {dims:?} has a zero dimension"
            )));
        }
        Ok(Self { dims })
    }

    /// Get total number of elements
    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Get number of dimensions
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Shape with a leading frame axis prepended
    #[must_use]
    pub fn with_frames(&self, frames: usize) -> Self {
        let mut dims = Vec::with_capacity(self.dims.len() + 1);
        dims.push(frames);
        dims.extend_from_slice(&self.dims);
        Self { dims }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_total_elements() {
        let shape = Shape::new(vec![2, 3, 4]);
        assert_eq!(shape.total_elements(), 24);
    }

    #[test]
    fn test_shape_display() {
        let shape = Shape::new(vec![1, 224, 224, 3]);
        assert_eq!(format!("{shape}"), "[1, 224, 224, 3]");
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(Shape::checked(vec![4, 0, 3]).is_err());
        assert!(Shape::checked(vec![4, 1, 3]).is_ok());
    }

    #[test]
    fn test_with_frames_prepends_axis() {
        let shape = Shape::new(vec![8, 8, 3]).with_frames(2);
        assert_eq!(shape.dims, vec![2, 8, 8, 3]);
        assert_eq!(shape.rank(), 4);
    }
}
