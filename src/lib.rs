//! Grid-based fluid simulation with the semi-Lagrangian "Stable Fluids"
//! method on grids of any dimensionality.
//!
//! The engine lives in [`operators`], [`solver`] and [`fluid`]; [`scene`],
//! [`app`] and the rendering helpers drive it for the interactive viewer.

pub mod app;
pub mod error;
pub mod fluid;
pub mod grid;
pub mod operators;
pub mod scene;
pub mod solver;
pub mod utils;
pub mod views;

pub use app::App;
pub use error::{FluidError, Result};
pub use fluid::{Curl, FluidConfig, FluidState, Quantities, QuantityId};
pub use grid::GridShape;
pub use solver::SolverKind;
