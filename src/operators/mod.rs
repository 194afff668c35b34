//! Discrete differential operators on the full grid.
//!
//! Per-axis banded matrices are built from [`Stencil`]s and then lifted to
//! the whole grid, either one operator per axis (gradient) or folded into a
//! single operator (Laplacian).

pub mod kronecker;
pub mod stencil;

use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{FluidError, Result};
use crate::grid::GridShape;

pub use kronecker::{identity, kron, kron_sum};
pub use stencil::{difference, differences, stencil_radius, Stencil};

/// How per-axis operators are lifted to the full grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// Embed every axis operator separately: `I ⊗ .. ⊗ D_i ⊗ .. ⊗ I`.
    PerAxis,
    /// Fold all axis operators into their Kronecker sum.
    KroneckerSum,
}

/// Full-grid operators produced by [`build_operators`].
#[derive(Debug, Clone)]
pub enum Operators {
    PerAxis(Vec<CscMatrix<f64>>),
    Combined(CscMatrix<f64>),
}

impl Operators {
    pub fn into_per_axis(self) -> Option<Vec<CscMatrix<f64>>> {
        match self {
            Operators::PerAxis(operators) => Some(operators),
            Operators::Combined(_) => None,
        }
    }

    pub fn into_combined(self) -> Option<CscMatrix<f64>> {
        match self {
            Operators::Combined(operator) => Some(operator),
            Operators::PerAxis(_) => None,
        }
    }
}

/// Square banded matrix with the stencil on diagonals `-radius..=radius`.
///
/// Diagonals are truncated at the edges, which amounts to zero values
/// outside the domain.
pub fn banded(length: usize, stencil: &Stencil) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(length, length);
    for (offset, coefficient) in stencil.offsets() {
        if coefficient == 0.0 {
            continue;
        }
        for row in 0..length {
            let col = row as isize + offset;
            if col >= 0 && (col as usize) < length {
                coo.push(row, col as usize, coefficient);
            }
        }
    }
    CscMatrix::from(&coo)
}

/// Lifts per-axis stencils to operators on the whole grid.
///
/// A single stencil is used for every axis.
pub fn build_operators(
    shape: &GridShape,
    stencils: &[Stencil],
    assembly: Assembly,
) -> Result<Operators> {
    let axes = shape.axes();
    let stencils: Vec<&Stencil> = match stencils.len() {
        1 => vec![&stencils[0]; axes.len()],
        n if n == axes.len() => stencils.iter().collect(),
        got => {
            return Err(FluidError::StencilCountMismatch {
                expected: axes.len(),
                got,
            })
        }
    };

    let factors: Vec<CscMatrix<f64>> = axes
        .iter()
        .zip(stencils)
        .map(|(&length, stencil)| banded(length, stencil))
        .collect();

    match assembly {
        Assembly::PerAxis => {
            let operators = (0..axes.len())
                .map(|axis| embed(axes, axis, &factors[axis]))
                .collect();
            Ok(Operators::PerAxis(operators))
        }
        Assembly::KroneckerSum => {
            // After folding axis k, the accumulator is the Kronecker sum of the
            // operators of axes 0..=k acting on the grid made of those axes.
            let mut factors = factors.into_iter();
            let mut accumulator = factors
                .next()
                .ok_or(FluidError::EmptyShape)?;
            for factor in factors {
                accumulator = kron_sum(&accumulator, &factor);
            }
            Ok(Operators::Combined(accumulator))
        }
    }
}

/// `I ⊗ .. ⊗ factor ⊗ .. ⊗ I` with `factor` in position `axis`.
fn embed(axes: &[usize], axis: usize, factor: &CscMatrix<f64>) -> CscMatrix<f64> {
    let outer: usize = axes[..axis].iter().product();
    let inner: usize = axes[axis + 1..].iter().product();
    kron(&kron(&identity(outer), factor), &identity(inner))
}

/// First-derivative operator for each axis.
pub fn gradient(shape: &GridShape, accuracy: usize) -> Result<Vec<CscMatrix<f64>>> {
    let stencil = difference(1, accuracy)?;
    let operators = build_operators(shape, &[stencil], Assembly::PerAxis)?;
    Ok(operators.into_per_axis().unwrap_or_default())
}

/// Sum of second derivatives over all axes.
pub fn laplacian(shape: &GridShape, accuracy: usize) -> Result<CscMatrix<f64>> {
    let stencil = difference(2, accuracy)?;
    build_operators(shape, &[stencil], Assembly::KroneckerSum)?
        .into_combined()
        .ok_or(FluidError::EmptyShape)
}
