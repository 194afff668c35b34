//! Sparse Kronecker product and sum.
//!
//! Both follow the row-major cell ordering of [`crate::grid::GridShape`]:
//! the left operand acts on the slower (outer) axes and the right operand on
//! the faster (inner) axes.

use nalgebra_sparse::{CooMatrix, CscMatrix};

pub fn identity(n: usize) -> CscMatrix<f64> {
    CscMatrix::identity(n)
}

/// `a ⊗ b`.
pub fn kron(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let (rows, cols) = (b.nrows(), b.ncols());
    let mut coo = CooMatrix::new(a.nrows() * rows, a.ncols() * cols);
    for (i, j, &outer) in a.triplet_iter() {
        for (k, l, &inner) in b.triplet_iter() {
            coo.push(i * rows + k, j * cols + l, outer * inner);
        }
    }
    CscMatrix::from(&coo)
}

/// `a ⊕ b = a ⊗ I + I ⊗ b` for square `a` and `b`.
///
/// Note the operand order: `a` ends up on the outer axes. Swapping the
/// arguments yields the operator of the transposed grid, which is only equal
/// when both axes have the same length and operator.
pub fn kron_sum(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    debug_assert_eq!(a.nrows(), a.ncols());
    debug_assert_eq!(b.nrows(), b.ncols());
    let (m, n) = (a.nrows(), b.nrows());
    let mut coo = CooMatrix::new(m * n, m * n);
    for (i, j, &value) in a.triplet_iter() {
        for k in 0..n {
            coo.push(i * n + k, j * n + k, value);
        }
    }
    for (k, l, &value) in b.triplet_iter() {
        for i in 0..m {
            coo.push(i * n + k, i * n + l, value);
        }
    }
    // Duplicate entries (the shared diagonal) are summed by the conversion.
    CscMatrix::from(&coo)
}
