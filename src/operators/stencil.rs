//! Centered finite-difference stencils.
//!
//! Weights come from inverting the Vandermonde matrix of the integer offsets
//! `-radius..=radius`: row `k` of the inverse maps samples to the coefficient
//! of `x^k` in the interpolating polynomial, so scaling it by `k!` gives the
//! weights of the `k`-th derivative at the center.

use nalgebra::DMatrix;

use crate::error::{FluidError, Result};

/// Finite-difference weights on the offsets `-radius..=radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    coefficients: Vec<f64>,
}

impl Stencil {
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn radius(&self) -> usize {
        self.coefficients.len() / 2
    }

    /// Offsets paired with their coefficients, from `-radius` up.
    pub fn offsets(&self) -> impl Iterator<Item = (isize, f64)> + '_ {
        let radius = self.radius() as isize;
        self.coefficients
            .iter()
            .enumerate()
            .map(move |(i, &c)| (i as isize - radius, c))
    }

    /// Weighted sum over samples taken at `-radius..=radius`.
    pub fn apply(&self, samples: &[f64]) -> f64 {
        debug_assert_eq!(samples.len(), self.coefficients.len());
        self.coefficients
            .iter()
            .zip(samples)
            .map(|(c, s)| c * s)
            .sum()
    }
}

/// Half-width of the centered stencil for a derivative order and accuracy.
pub fn stencil_radius(derivative: usize, accuracy: usize) -> usize {
    (accuracy + (derivative + 1) / 2).saturating_sub(1)
}

/// Centered stencil for the `derivative`-th derivative at the given accuracy.
pub fn difference(derivative: usize, accuracy: usize) -> Result<Stencil> {
    if accuracy == 0 {
        return Err(FluidError::InvalidAccuracy(accuracy));
    }
    let radius = stencil_radius(derivative, accuracy);
    let points = 2 * radius + 1;

    // Rows are the offsets, columns the increasing powers.
    let vandermonde = DMatrix::from_fn(points, points, |row, power| {
        (row as f64 - radius as f64).powi(power as i32)
    });
    let inverse = vandermonde
        .try_inverse()
        .ok_or(FluidError::SingularStencil { radius })?;

    let scale = factorial(derivative);
    let coefficients = inverse
        .row(derivative)
        .iter()
        .map(|&weight| weight * scale)
        .collect();
    Ok(Stencil { coefficients })
}

/// One stencil per requested derivative order, all at the same accuracy.
pub fn differences(accuracy: usize, orders: &[usize]) -> Result<Vec<Stencil>> {
    orders
        .iter()
        .map(|&order| difference(order, accuracy))
        .collect()
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}
