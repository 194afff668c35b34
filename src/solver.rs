//! Prefactorized linear solvers for the diffusion and pressure systems.
//!
//! A solver is bound to its matrix when it is built and never sees another
//! one: every call to [`LinearSolver::solve`] reuses the same factorization
//! (or preconditioner) with a new right-hand side.

use nalgebra::DVector;
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::CscMatrix;

use crate::error::{FluidError, Result};

/// Solves `A x = rhs` for the matrix the solver was built from.
pub trait LinearSolver: Send + Sync {
    fn solve(&self, rhs: &DVector<f64>) -> DVector<f64>;
}

/// Which solver backs the diffusion and pressure systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Sparse Cholesky, solved by substitution every frame.
    #[default]
    Cholesky,
    /// Jacobi-preconditioned conjugate gradients.
    ConjugateGradient,
}

/// Sign of the (symmetric) matrix handed to [`factorize`].
///
/// The Laplacian with truncated boundaries is negative definite; it is
/// factorized as `-L` and the right-hand side is negated on every solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Definiteness {
    Positive,
    Negative,
}

impl Definiteness {
    fn sign(self) -> f64 {
        match self {
            Definiteness::Positive => 1.0,
            Definiteness::Negative => -1.0,
        }
    }
}

/// Builds a solver of the requested kind for `matrix`.
///
/// `operator` names the system in errors and logs.
pub fn factorize(
    kind: SolverKind,
    matrix: &CscMatrix<f64>,
    definiteness: Definiteness,
    operator: &'static str,
) -> Result<Box<dyn LinearSolver>> {
    log::debug!(
        "factorizing {operator} operator ({} rows, {} non-zeros) with {kind:?}",
        matrix.nrows(),
        matrix.nnz()
    );
    match kind {
        SolverKind::Cholesky => Ok(Box::new(CholeskySolver::factorize(
            matrix,
            definiteness,
            operator,
        )?)),
        SolverKind::ConjugateGradient => Ok(Box::new(ConjugateGradientSolver::new(
            matrix,
            definiteness,
            operator,
        )?)),
    }
}

fn signed(matrix: &CscMatrix<f64>, sign: f64) -> CscMatrix<f64> {
    let mut matrix = matrix.clone();
    if sign != 1.0 {
        for value in matrix.values_mut() {
            *value *= sign;
        }
    }
    matrix
}

pub struct CholeskySolver {
    factor: CscCholesky<f64>,
    sign: f64,
}

impl CholeskySolver {
    pub fn factorize(
        matrix: &CscMatrix<f64>,
        definiteness: Definiteness,
        operator: &'static str,
    ) -> Result<Self> {
        let sign = definiteness.sign();
        let factor = CscCholesky::factor(&signed(matrix, sign)).map_err(|err| {
            FluidError::Factorization {
                operator,
                reason: format!("{err:?}"),
            }
        })?;
        Ok(Self { factor, sign })
    }
}

impl LinearSolver for CholeskySolver {
    fn solve(&self, rhs: &DVector<f64>) -> DVector<f64> {
        let rhs = rhs * self.sign;
        let solution = self.factor.solve(&rhs);
        DVector::from_column_slice(solution.as_slice())
    }
}

/// Conjugate gradients with a diagonal preconditioner.
///
/// Cheaper to set up than [`CholeskySolver`] on large grids, where the
/// Cholesky factor fills in the whole band.
pub struct ConjugateGradientSolver {
    matrix: CscMatrix<f64>,
    inverse_diagonal: DVector<f64>,
    sign: f64,
    max_iterations: usize,
}

impl ConjugateGradientSolver {
    /// Relative residual at which iteration stops.
    pub const TOLERANCE: f64 = 1e-10;

    pub fn new(
        matrix: &CscMatrix<f64>,
        definiteness: Definiteness,
        operator: &'static str,
    ) -> Result<Self> {
        let sign = definiteness.sign();
        let matrix = signed(matrix, sign);
        let mut diagonal = DVector::<f64>::zeros(matrix.nrows());
        for (row, col, &value) in matrix.triplet_iter() {
            if row == col {
                diagonal[row] += value;
            }
        }
        if let Some(row) = diagonal.iter().position(|&d| d <= 0.0) {
            return Err(FluidError::Factorization {
                operator,
                reason: format!("non-positive diagonal entry at row {row}"),
            });
        }
        let max_iterations = 10 * matrix.nrows().max(10);
        Ok(Self {
            inverse_diagonal: diagonal.map(|d| 1.0 / d),
            matrix,
            sign,
            max_iterations,
        })
    }

}

impl LinearSolver for ConjugateGradientSolver {
    fn solve(&self, rhs: &DVector<f64>) -> DVector<f64> {
        let b = rhs * self.sign;
        let mut x = DVector::<f64>::zeros(b.len());
        let threshold = Self::TOLERANCE * b.norm();
        if threshold == 0.0 {
            return x;
        }

        let mut residual = b;
        let mut z = residual.component_mul(&self.inverse_diagonal);
        let mut direction = z.clone();
        let mut rz = residual.dot(&z);

        for iteration in 0..self.max_iterations {
            let a_direction = &self.matrix * &direction;
            let alpha = rz / direction.dot(&a_direction);
            x.axpy(alpha, &direction, 1.0);
            residual.axpy(-alpha, &a_direction, 1.0);
            if residual.norm() <= threshold {
                log::trace!("conjugate gradients converged after {} iterations", iteration + 1);
                return x;
            }
            z = residual.component_mul(&self.inverse_diagonal);
            let rz_next = residual.dot(&z);
            let beta = rz_next / rz;
            rz = rz_next;
            direction.axpy(1.0, &z, beta);
        }
        log::warn!(
            "conjugate gradients stopped after {} iterations, residual {:.3e}",
            self.max_iterations,
            residual.norm()
        );
        x
    }
}
