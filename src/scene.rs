//! The demo scene: three coloured jets on a circle, aimed at the centre.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::fluid::{FluidConfig, FluidState, QuantityId};
use crate::solver::SolverKind;

/// Dye channels, one per inflow.
pub const CHANNELS: [&str; 3] = ["r", "g", "b"];

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Grid size as (rows, columns).
    pub resolution: [usize; 2],
    pub viscosity: f64,
    /// Number of frames the viewer runs before pausing.
    pub duration: usize,
    /// Distance between the inflows and the nearest domain edge.
    pub inflow_padding: usize,
    /// Last frame that still receives inflow.
    pub inflow_duration: usize,
    pub inflow_radius: f64,
    /// Velocity added to the inflow cells every inflow frame.
    pub inflow_velocity: f64,
    pub solver: SolverKind,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            resolution: [128, 128],
            viscosity: 1e-3,
            duration: 200,
            inflow_padding: 12,
            inflow_duration: 60,
            inflow_radius: 4.0,
            inflow_velocity: 0.5,
            solver: SolverKind::Cholesky,
        }
    }
}

/// A circular source of velocity and dye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inflow {
    pub center: [f64; 2],
    /// Unit vector the jet points along.
    pub direction: [f64; 2],
}

impl Inflow {
    pub fn contains(&self, cell: [f64; 2], radius: f64) -> bool {
        let d0 = cell[0] - self.center[0];
        let d1 = cell[1] - self.center[1];
        (d0 * d0 + d1 * d1).sqrt() <= radius
    }
}

/// Progress report for a single frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    pub frame: usize,
    pub max_speed: f64,
    pub elapsed: Duration,
}

pub struct Scene {
    config: SceneConfig,
    fluid: FluidState,
    channels: Vec<QuantityId>,
    inflows: Vec<Inflow>,
    inflow_velocity: DMatrix<f64>,
    inflow_dye: Vec<DVector<f64>>,
    frame: usize,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Result<Self> {
        let fluid_config = FluidConfig {
            viscosity: config.viscosity,
            solver: config.solver,
            ..FluidConfig::default()
        };
        let started = Instant::now();
        let fluid = FluidState::with_config(&config.resolution, fluid_config, CHANNELS)?;
        log::info!(
            "built {}x{} fluid in {:?}",
            config.resolution[0],
            config.resolution[1],
            started.elapsed()
        );

        let channels = CHANNELS
            .iter()
            .filter_map(|label| fluid.quantities.id(label))
            .collect();
        let inflows = inflows(&config);

        let mut inflow_velocity = DMatrix::<f64>::zeros(fluid.size(), 2);
        let mut inflow_dye = vec![DVector::<f64>::zeros(fluid.size()); inflows.len()];
        for cell in 0..fluid.size() {
            let position = [fluid.indices()[(cell, 0)], fluid.indices()[(cell, 1)]];
            for (inflow, dye) in inflows.iter().zip(inflow_dye.iter_mut()) {
                if inflow.contains(position, config.inflow_radius) {
                    inflow_velocity[(cell, 0)] = inflow.direction[0] * config.inflow_velocity;
                    inflow_velocity[(cell, 1)] = inflow.direction[1] * config.inflow_velocity;
                    dye[cell] = 1.0;
                }
            }
        }

        Ok(Self {
            config,
            fluid,
            channels,
            inflows,
            inflow_velocity,
            inflow_dye,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn fluid(&self) -> &FluidState {
        &self.fluid
    }

    pub fn inflows(&self) -> &[Inflow] {
        &self.inflows
    }

    /// Dye channel handles in [`CHANNELS`] order.
    pub fn channels(&self) -> &[QuantityId] {
        &self.channels
    }

    /// Number of frames simulated so far.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.config.duration
    }

    /// Advects, injects the inflow while it lasts, then projects.
    pub fn step(&mut self) -> FrameStats {
        let started = Instant::now();
        self.fluid.advect_diffuse();

        if self.frame <= self.config.inflow_duration {
            self.fluid.velocity += &self.inflow_velocity;
            for (&channel, dye) in self.channels.iter().zip(&self.inflow_dye) {
                self.fluid.quantities[channel] += dye;
            }
        }

        self.fluid.project();

        let stats = FrameStats {
            frame: self.frame,
            max_speed: self.fluid.max_speed(),
            elapsed: started.elapsed(),
        };
        log::debug!(
            "frame {} done in {:?}, max speed {:.3}",
            stats.frame,
            stats.elapsed,
            stats.max_speed
        );
        self.frame += 1;
        stats
    }
}

/// Inflows evenly spaced on a circle around the grid centre, pointing inwards.
pub fn inflows(config: &SceneConfig) -> Vec<Inflow> {
    let center = [
        (config.resolution[0] / 2) as f64,
        (config.resolution[1] / 2) as f64,
    ];
    let radius = (center[0].min(center[1]) - config.inflow_padding as f64).max(0.0);
    (0..CHANNELS.len())
        .map(|i| {
            let angle = i as f64 * TAU / CHANNELS.len() as f64;
            let (sin, cos) = angle.sin_cos();
            Inflow {
                center: [center[0] + radius * cos, center[1] + radius * sin],
                direction: [-cos, -sin],
            }
        })
        .collect()
}
