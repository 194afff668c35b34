//! The stable-fluids state and its two per-frame updates.
//!
//! A frame is `advect_diffuse`, then whatever inflow the caller injects into
//! [`FluidState::velocity`] and [`FluidState::quantities`], then `project`.
//! The state does not enforce that order.

pub mod interpolation;
pub mod quantities;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

use crate::error::{FluidError, Result};
use crate::grid::GridShape;
use crate::operators;
use crate::solver::{factorize, Definiteness, LinearSolver, SolverKind};

use interpolation::Resampler;
pub use quantities::{Quantities, QuantityId};

/// Construction parameters for a [`FluidState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidConfig {
    /// Kinematic viscosity in cells² per step. Fixed for the lifetime of
    /// the state because the diffusion system is factorized once.
    pub viscosity: f64,
    /// Accuracy order of the gradient and Laplacian stencils.
    pub accuracy: usize,
    pub solver: SolverKind,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            viscosity: 0.0,
            accuracy: 1,
            solver: SolverKind::Cholesky,
        }
    }
}

/// Vorticity of a velocity field.
#[derive(Debug, Clone, PartialEq)]
pub enum Curl {
    /// Out-of-plane component on a 2D grid.
    Scalar(DVector<f64>),
    /// Full vector on a 3D grid, one field per axis.
    Vector([DVector<f64>; 3]),
}

pub struct FluidState {
    shape: GridShape,
    config: FluidConfig,
    indices: DMatrix<f64>,
    gradient: Vec<CscMatrix<f64>>,
    pressure_solver: Box<dyn LinearSolver>,
    viscosity_solver: Option<Box<dyn LinearSolver>>,
    /// One row per cell, one column per axis, in cells per step.
    pub velocity: DMatrix<f64>,
    pub quantities: Quantities,
}

impl FluidState {
    /// Builds a fluid with default stencils and a Cholesky solver.
    pub fn new<I, S>(shape: &[usize], viscosity: f64, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = FluidConfig {
            viscosity,
            ..FluidConfig::default()
        };
        Self::with_config(shape, config, labels)
    }

    pub fn with_config<I, S>(shape: &[usize], config: FluidConfig, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !config.viscosity.is_finite() || config.viscosity < 0.0 {
            return Err(FluidError::InvalidViscosity(config.viscosity));
        }
        let shape = GridShape::new(shape)?;
        let size = shape.size();
        let quantities = Quantities::new(labels, size)?;

        let gradient = operators::gradient(&shape, config.accuracy)?;
        let laplacian = operators::laplacian(&shape, config.accuracy)?;
        log::debug!(
            "assembled operators for grid {:?}: laplacian has {} non-zeros",
            shape.axes(),
            laplacian.nnz()
        );

        // Truncated boundaries make the Laplacian negative definite, so both
        // systems are symmetric definite and admit a Cholesky factor.
        let pressure_solver =
            factorize(config.solver, &laplacian, Definiteness::Negative, "pressure")?;
        let viscosity_solver = if config.viscosity > 0.0 {
            let diffusion = diffusion_matrix(&laplacian, config.viscosity);
            Some(factorize(
                config.solver,
                &diffusion,
                Definiteness::Positive,
                "diffusion",
            )?)
        } else {
            None
        };

        Ok(Self {
            indices: shape.index_array(),
            velocity: DMatrix::zeros(size, shape.dimensions()),
            quantities,
            gradient,
            pressure_solver,
            viscosity_solver,
            config,
            shape,
        })
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.shape.size()
    }

    pub fn dimensions(&self) -> usize {
        self.shape.dimensions()
    }

    pub fn viscosity(&self) -> f64 {
        self.config.viscosity
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Integer coordinates of every cell, shaped like [`Self::velocity`].
    pub fn indices(&self) -> &DMatrix<f64> {
        &self.indices
    }

    /// Per-axis first-derivative operators.
    pub fn gradient(&self) -> &[CscMatrix<f64>] {
        &self.gradient
    }

    /// Semi-Lagrangian advection of velocity and every quantity, followed by
    /// an implicit diffusion solve when the viscosity is positive.
    pub fn advect_diffuse(&mut self) {
        // Trace every cell one step back along its own velocity.
        let sources = &self.indices - &self.velocity;
        let resampler = Resampler::new(&self.shape, &sources);
        let diffusion = self.viscosity_solver.as_deref();

        for axis in 0..self.dimensions() {
            let component = self.velocity.column(axis).into_owned();
            let advected = diffuse(diffusion, resampler.resample(&component));
            self.velocity.set_column(axis, &advected);
        }
        for field in self.quantities.fields_mut() {
            *field = diffuse(diffusion, resampler.resample(field));
        }
    }

    /// Removes the divergent part of the velocity by subtracting the gradient
    /// of the pressure that solves `L p = div v`.
    ///
    /// The pressure is only defined up to the Laplacian's null space, which
    /// the gradient does not see.
    pub fn project(&mut self) {
        let divergence = self.divergence();
        let pressure = self.pressure_solver.solve(&divergence);
        for (axis, operator) in self.gradient.iter().enumerate() {
            let correction = operator * &pressure;
            let mut component = self.velocity.column_mut(axis);
            component -= &correction;
        }
    }

    /// `advect_diffuse` followed by `project`, for callers without inflow.
    pub fn step(&mut self) {
        self.advect_diffuse();
        self.project();
    }

    /// Discrete divergence of the velocity field.
    pub fn divergence(&self) -> DVector<f64> {
        let mut divergence = DVector::<f64>::zeros(self.size());
        for (axis, operator) in self.gradient.iter().enumerate() {
            divergence += operator * &self.velocity.column(axis).into_owned();
        }
        divergence
    }

    pub fn curl(&self) -> Result<Curl> {
        let derivative = |operator: usize, component: usize| -> DVector<f64> {
            &self.gradient[operator] * &self.velocity.column(component).into_owned()
        };
        match self.dimensions() {
            2 => Ok(Curl::Scalar(derivative(0, 1) - derivative(1, 0))),
            3 => Ok(Curl::Vector([
                derivative(1, 2) - derivative(2, 1),
                derivative(2, 0) - derivative(0, 2),
                derivative(0, 1) - derivative(1, 0),
            ])),
            dimensions => Err(FluidError::UnsupportedCurl(dimensions)),
        }
    }

    /// Largest velocity magnitude over all cells.
    pub fn max_speed(&self) -> f64 {
        self.velocity
            .row_iter()
            .map(|row| row.norm())
            .fold(0.0, f64::max)
    }
}

/// `I - viscosity * L`.
fn diffusion_matrix(laplacian: &CscMatrix<f64>, viscosity: f64) -> CscMatrix<f64> {
    let mut coo = nalgebra_sparse::CooMatrix::new(laplacian.nrows(), laplacian.ncols());
    for row in 0..laplacian.nrows() {
        coo.push(row, row, 1.0);
    }
    for (row, col, &value) in laplacian.triplet_iter() {
        coo.push(row, col, -viscosity * value);
    }
    CscMatrix::from(&coo)
}

fn diffuse(solver: Option<&dyn LinearSolver>, field: DVector<f64>) -> DVector<f64> {
    match solver {
        Some(solver) => solver.solve(&field),
        None => field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_construction_zeroes_fields() {
        let fluid = FluidState::new(&[4, 5], 0.01, ["dye"]).unwrap();
        assert_eq!(fluid.size(), 20);
        assert_eq!(fluid.dimensions(), 2);
        assert_eq!(fluid.velocity.shape(), (20, 2));
        assert!(fluid.velocity.iter().all(|&v| v == 0.0));
        assert!(fluid.quantities.get("dye").unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(fluid.indices()[(7, 0)], 1.0);
        assert_eq!(fluid.indices()[(7, 1)], 2.0);
        assert_eq!(fluid.viscosity(), 0.01);
        assert_eq!(fluid.config().accuracy, 1);
        assert_eq!(fluid.config().solver, SolverKind::Cholesky);
    }

    #[test]
    fn test_gradient_of_coordinates() {
        let fluid = FluidState::new(&[5, 6], 0.0, ["dye"]).unwrap();
        assert_eq!(fluid.gradient().len(), 2);
        let interior = fluid.shape().flatten(&[2, 3]);
        for (axis, operator) in fluid.gradient().iter().enumerate() {
            let coordinate = fluid.indices().column(axis).into_owned();
            let derivative = operator * &coordinate;
            assert_abs_diff_eq!(derivative[interior], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_viscosity_rejected() {
        for viscosity in [-0.1, f64::NAN, f64::INFINITY] {
            let result = FluidState::new(&[4, 4], viscosity, Vec::<String>::new());
            assert!(matches!(result, Err(FluidError::InvalidViscosity(_))));
        }
    }

    #[test]
    fn test_invalid_shape_rejected() {
        let result = FluidState::new(&[], 0.0, ["dye"]);
        assert!(matches!(result, Err(FluidError::EmptyShape)));
        let result = FluidState::new(&[3, 0], 0.0, ["dye"]);
        assert!(matches!(result, Err(FluidError::ZeroLengthAxis { axis: 1 })));
    }

    #[test]
    fn test_zero_viscosity_skips_diffusion_solver() {
        let fluid = FluidState::new(&[4, 4], 0.0, ["dye"]).unwrap();
        assert!(fluid.viscosity_solver.is_none());
        let fluid = FluidState::new(&[4, 4], 0.5, ["dye"]).unwrap();
        assert!(fluid.viscosity_solver.is_some());
    }

    #[test]
    fn test_diffusion_matrix() {
        let shape = GridShape::new([3]).unwrap();
        let laplacian = operators::laplacian(&shape, 1).unwrap();
        let diffusion = diffusion_matrix(&laplacian, 0.5);
        let mut dense = DMatrix::<f64>::zeros(3, 3);
        for (i, j, &v) in diffusion.triplet_iter() {
            dense[(i, j)] += v;
        }
        let expected = DMatrix::from_row_slice(3, 3, &[2.0, -0.5, 0.0, -0.5, 2.0, -0.5, 0.0, -0.5, 2.0]);
        assert_abs_diff_eq!(dense, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_diffusion_spreads_and_smooths() {
        let mut fluid = FluidState::new(&[9, 9], 0.5, ["dye"]).unwrap();
        let center = fluid.shape().flatten(&[4, 4]);
        fluid.quantities.get_mut("dye").unwrap()[center] = 1.0;
        fluid.advect_diffuse();
        let dye = fluid.quantities.get("dye").unwrap();
        assert!(dye[center] < 1.0);
        assert!(dye[fluid.shape().flatten(&[4, 5])] > 0.0);
        assert!(dye[fluid.shape().flatten(&[3, 4])] > 0.0);
        assert!(dye.iter().all(|&v| v >= -1e-12));
    }

    #[test]
    fn test_curl_of_rigid_rotation() {
        // v = (-(j - c), i - c) has curl 2 in the interior.
        let mut fluid = FluidState::new(&[7, 7], 0.0, Vec::<String>::new()).unwrap();
        for k in 0..fluid.size() {
            let i = fluid.indices()[(k, 0)] - 3.0;
            let j = fluid.indices()[(k, 1)] - 3.0;
            fluid.velocity[(k, 0)] = -j;
            fluid.velocity[(k, 1)] = i;
        }
        let Curl::Scalar(curl) = fluid.curl().unwrap() else {
            panic!("expected a scalar curl on a 2D grid");
        };
        assert_abs_diff_eq!(curl[fluid.shape().flatten(&[3, 3])], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curl[fluid.shape().flatten(&[2, 4])], 2.0, epsilon = 1e-12);
        // rotation is divergence free
        assert_abs_diff_eq!(fluid.divergence()[fluid.shape().flatten(&[3, 3])], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_curl_dimensions() {
        let fluid = FluidState::new(&[3, 3, 3], 0.0, ["dye"]).unwrap();
        assert!(matches!(fluid.curl(), Ok(Curl::Vector(_))));
        let fluid = FluidState::new(&[5], 0.0, ["dye"]).unwrap();
        assert_eq!(fluid.curl(), Err(FluidError::UnsupportedCurl(1)));
    }

    #[test]
    fn test_max_speed() {
        let mut fluid = FluidState::new(&[3, 3], 0.0, ["dye"]).unwrap();
        fluid.velocity[(4, 0)] = 3.0;
        fluid.velocity[(4, 1)] = 4.0;
        assert_abs_diff_eq!(fluid.max_speed(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_conjugate_gradient_config_matches_cholesky() {
        let config = FluidConfig {
            viscosity: 0.1,
            solver: SolverKind::ConjugateGradient,
            ..FluidConfig::default()
        };
        let mut iterative = FluidState::with_config(&[8, 6], config, ["dye"]).unwrap();
        let mut direct = FluidState::new(&[8, 6], 0.1, ["dye"]).unwrap();
        for fluid in [&mut iterative, &mut direct] {
            for k in 0..fluid.size() {
                fluid.velocity[(k, 0)] = ((k % 5) as f64 - 2.0) * 0.3;
                fluid.velocity[(k, 1)] = ((k % 3) as f64 - 1.0) * 0.2;
            }
            fluid.quantities.get_mut("dye").unwrap()[10] = 1.0;
            fluid.step();
        }
        assert_abs_diff_eq!(iterative.velocity, direct.velocity, epsilon = 1e-6);
        assert_abs_diff_eq!(
            iterative.quantities.get("dye").unwrap(),
            direct.quantities.get("dye").unwrap(),
            epsilon = 1e-6
        );
    }
}
