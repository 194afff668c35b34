//! Resampling a grid field at arbitrary positions.
//!
//! Catmull-Rom cubic interpolation as a tensor product over the axes. A
//! position outside the grid extent samples zero, so nothing flows in through
//! the boundary. Inside the grid, taps past the edge reuse the edge cell. The
//! result is limited to the range of the cell corners that bracket the
//! position, so resampling never creates new extrema.

use nalgebra::{DMatrix, DVector};

use crate::grid::GridShape;

const TAPS: usize = 4;

/// Precomputed taps and weights for a fixed set of sample positions.
///
/// Built once per advection step and applied to every advected field.
pub struct Resampler {
    /// `TAPS^dimensions` (flat index, weight) pairs per sample.
    taps: Vec<(usize, f64)>,
    /// `2^dimensions` bracketing corners per sample.
    corners: Vec<usize>,
    /// Whether each sample lies inside the grid extent.
    inside: Vec<bool>,
    taps_per_sample: usize,
    corners_per_sample: usize,
}

impl Resampler {
    /// `positions` holds one row of grid coordinates per sample.
    pub fn new(shape: &GridShape, positions: &DMatrix<f64>) -> Self {
        let dimensions = shape.dimensions();
        debug_assert_eq!(positions.ncols(), dimensions);
        let strides = shape.strides();
        let taps_per_sample = TAPS.pow(dimensions as u32);
        let corners_per_sample = 1 << dimensions;
        let samples = positions.nrows();

        let mut taps = Vec::with_capacity(samples * taps_per_sample);
        let mut corners = Vec::with_capacity(samples * corners_per_sample);
        let mut inside = Vec::with_capacity(samples);
        let mut axis_taps = vec![[(0usize, 0.0f64); TAPS]; dimensions];
        let mut axis_corners = vec![[0usize; 2]; dimensions];

        for sample in 0..samples {
            let within = shape.axes().iter().enumerate().all(|(axis, &length)| {
                let position = positions[(sample, axis)];
                position >= 0.0 && position <= (length - 1) as f64
            });
            inside.push(within);

            for (axis, &length) in shape.axes().iter().enumerate() {
                // Outside samples keep a full set of taps, read as zero later.
                let position = positions[(sample, axis)].clamp(0.0, (length - 1) as f64);
                let base = position.floor();
                let weights = catmull_rom(position - base);
                let base = base as isize;
                for (tap, weight) in weights.into_iter().enumerate() {
                    let index = (base + tap as isize - 1).clamp(0, length as isize - 1) as usize;
                    axis_taps[axis][tap] = (index * strides[axis], weight);
                }
                let lower = base as usize;
                axis_corners[axis] = [lower * strides[axis], (lower + 1).min(length - 1) * strides[axis]];
            }

            for combination in 0..taps_per_sample {
                let mut rest = combination;
                let mut flat = 0;
                let mut weight = 1.0;
                for axis in (0..dimensions).rev() {
                    let (offset, w) = axis_taps[axis][rest % TAPS];
                    rest /= TAPS;
                    flat += offset;
                    weight *= w;
                }
                taps.push((flat, weight));
            }
            for combination in 0..corners_per_sample {
                let flat = (0..dimensions)
                    .map(|axis| axis_corners[axis][(combination >> axis) & 1])
                    .sum();
                corners.push(flat);
            }
        }

        Self {
            taps,
            corners,
            inside,
            taps_per_sample,
            corners_per_sample,
        }
    }

    fn len(&self) -> usize {
        self.inside.len()
    }

    /// Samples `field` at every position the resampler was built for.
    pub fn resample(&self, field: &DVector<f64>) -> DVector<f64> {
        let taps = self.taps.chunks_exact(self.taps_per_sample);
        let corners = self.corners.chunks_exact(self.corners_per_sample);
        let values = taps.zip(corners).zip(&self.inside).map(|((taps, corners), &inside)| {
            if !inside {
                return 0.0;
            }
            let value: f64 = taps.iter().map(|&(flat, weight)| weight * field[flat]).sum();
            let (low, high) = corners.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(low, high), &flat| (low.min(field[flat]), high.max(field[flat])),
            );
            value.clamp(low, high)
        });
        DVector::from_iterator(self.len(), values)
    }
}

/// Catmull-Rom weights for the taps at offsets -1, 0, 1, 2 from the base cell.
fn catmull_rom(t: f64) -> [f64; TAPS] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
