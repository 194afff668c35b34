use nalgebra::DMatrix;

use crate::error::{FluidError, Result};

/// The discretization domain: one length per spatial axis.
///
/// Cells are flattened in row-major order, so the last axis varies fastest.
/// The Kronecker assembly in [`crate::operators`] uses the same ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridShape {
    axes: Vec<usize>,
}

impl GridShape {
    pub fn new(axes: impl Into<Vec<usize>>) -> Result<Self> {
        let axes = axes.into();
        if axes.is_empty() {
            return Err(FluidError::EmptyShape);
        }
        if let Some(axis) = axes.iter().position(|&length| length == 0) {
            return Err(FluidError::ZeroLengthAxis { axis });
        }
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.axes.iter().product()
    }

    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    /// Flat-index step for a unit move along each axis.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.axes.len()];
        for axis in (0..self.axes.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.axes[axis + 1];
        }
        strides
    }

    pub fn flatten(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.axes.len());
        index
            .iter()
            .zip(self.strides())
            .map(|(&i, stride)| i * stride)
            .sum()
    }

    pub fn unflatten(&self, mut flat: usize) -> Vec<usize> {
        let mut index = vec![0; self.axes.len()];
        for (axis, &length) in self.axes.iter().enumerate().rev() {
            index[axis] = flat % length;
            flat /= length;
        }
        index
    }

    /// Integer coordinates of every cell as a `size × dimensions` matrix.
    pub fn index_array(&self) -> DMatrix<f64> {
        let mut indices = DMatrix::<f64>::zeros(self.size(), self.dimensions());
        for flat in 0..self.size() {
            for (axis, coordinate) in self.unflatten(flat).into_iter().enumerate() {
                indices[(flat, axis)] = coordinate as f64;
            }
        }
        indices
    }
}
