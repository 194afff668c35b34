//! Error types for the fluid engine.

use thiserror::Error;

/// Errors raised while building or factorizing the simulation operators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FluidError {
    /// A grid needs at least one axis.
    #[error("grid shape must have at least one axis")]
    EmptyShape,

    /// Every axis must hold at least one cell.
    #[error("grid axis {axis} has zero length")]
    ZeroLengthAxis {
        /// Offending axis.
        axis: usize,
    },

    /// Stencil accuracy starts at 1.
    #[error("stencil accuracy must be at least 1, got {0}")]
    InvalidAccuracy(usize),

    /// The Vandermonde system for the stencil offsets could not be inverted.
    #[error("vandermonde matrix for stencil radius {radius} is singular")]
    SingularStencil {
        /// Stencil radius that was requested.
        radius: usize,
    },

    /// The number of stencils does not match the number of grid axes.
    #[error("expected {expected} stencils for the grid, got {got}")]
    StencilCountMismatch {
        /// Number of grid axes.
        expected: usize,
        /// Number of stencils supplied.
        got: usize,
    },

    /// Viscosity must be finite and non-negative.
    #[error("viscosity must be finite and non-negative, got {0}")]
    InvalidViscosity(f64),

    /// Quantity labels must be unique.
    #[error("duplicate quantity label: {0}")]
    DuplicateQuantity(String),

    /// Sparse factorization of an operator failed.
    #[error("failed to factorize {operator} operator: {reason}")]
    Factorization {
        /// Which operator was being factorized.
        operator: &'static str,
        /// Reason reported by the factorization.
        reason: String,
    },

    /// Curl only exists for two and three dimensional grids.
    #[error("curl is only defined for 2 or 3 dimensions, got {0}")]
    UnsupportedCurl(usize),
}

/// Result type for fluid operations.
pub type Result<T, E = FluidError> = std::result::Result<T, E>;
