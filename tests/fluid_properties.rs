//! Physical properties of the advection, diffusion and projection steps.

use stable_fluids::scene::{Scene, SceneConfig};
use stable_fluids::{FluidConfig, FluidState, SolverKind};

fn gaussian(fluid: &FluidState, center: [f64; 2], width: f64, scale: f64) -> Vec<f64> {
    (0..fluid.size())
        .map(|k| {
            let d0 = fluid.indices()[(k, 0)] - center[0];
            let d1 = fluid.indices()[(k, 1)] - center[1];
            scale * (-(d0 * d0 + d1 * d1) / width).exp()
        })
        .collect()
}

/// Deterministic noise in (-1, 1).
fn noise(k: usize) -> f64 {
    ((k as f64 * 12.9898).sin() * 43758.5453).fract()
}

fn chebyshev(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).map(|(&x, &y)| x.abs_diff(y)).max().unwrap_or(0)
}

/// Test that advection without velocity or viscosity changes nothing
#[test]
fn test_still_fluid_is_unchanged() {
    for shape in [vec![10, 10], vec![5, 6, 4]] {
        let mut fluid = FluidState::new(&shape, 0.0, ["dye", "heat"]).unwrap();
        for (k, value) in fluid.quantities.get_mut("dye").unwrap().iter_mut().enumerate() {
            *value = ((k * 37) % 11) as f64 / 11.0;
        }
        fluid.quantities.get_mut("heat").unwrap()[3] = -2.0;
        let before = fluid.quantities.clone();

        fluid.advect_diffuse();

        assert!(fluid.velocity.iter().all(|&v| v == 0.0));
        for ((_, after), (_, before)) in fluid.quantities.iter().zip(before.iter()) {
            assert_eq!(after, before);
        }
    }
}

/// Test that a unit velocity carries dye exactly one cell downstream
#[test]
fn test_unit_velocity_moves_dye_to_neighbor() {
    let mut fluid = FluidState::new(&[10, 10], 0.0, ["dye"]).unwrap();
    let shape = fluid.shape().clone();
    let cell = shape.flatten(&[5, 5]);
    let upstream = shape.flatten(&[4, 5]);
    fluid.velocity[(cell, 0)] = 1.0;
    fluid.quantities.get_mut("dye").unwrap()[upstream] = 1.0;

    fluid.advect_diffuse();

    let dye = fluid.quantities.get("dye").unwrap();
    assert_eq!(dye[cell], 1.0, "downstream neighbor should receive the dye");
    for k in 0..fluid.size() {
        let index = shape.unflatten(k);
        if chebyshev(&index, &[5, 5]) > 2 {
            assert_eq!(dye[k], 0.0, "cell {index:?} outside the stencil changed");
            assert_eq!(fluid.velocity[(k, 0)], 0.0);
            assert_eq!(fluid.velocity[(k, 1)], 0.0);
        }
    }
}

/// Test that a fractional velocity is partly carried along and stays local
#[test]
fn test_fractional_velocity_stays_local() {
    let mut fluid = FluidState::new(&[10, 10], 0.0, ["dye"]).unwrap();
    let shape = fluid.shape().clone();
    let cell = shape.flatten(&[5, 5]);
    fluid.velocity[(cell, 0)] = 0.5;

    fluid.advect_diffuse();

    let carried = fluid.velocity[(cell, 0)];
    assert!(carried > 0.0 && carried < 0.5, "got {carried}");
    for k in 0..fluid.size() {
        if chebyshev(&shape.unflatten(k), &[5, 5]) > 2 {
            assert_eq!(fluid.velocity[(k, 0)], 0.0);
            assert_eq!(fluid.velocity[(k, 1)], 0.0);
        }
    }
}

/// Test that projection removes most of the divergence and that repeating it
/// only changes the field a little
#[test]
fn test_projection_converges() {
    let mut fluid = FluidState::new(&[16, 16], 0.0, Vec::<String>::new()).unwrap();
    let v0 = gaussian(&fluid, [7.5, 7.5], 8.0, 1.0);
    let v1 = gaussian(&fluid, [6.0, 9.0], 6.0, 0.5);
    for k in 0..fluid.size() {
        fluid.velocity[(k, 0)] = v0[k];
        fluid.velocity[(k, 1)] = v1[k];
    }

    let initial_divergence = fluid.divergence().norm();
    let initial = fluid.velocity.clone();

    fluid.project();
    let first_divergence = fluid.divergence().norm();
    let once = fluid.velocity.clone();

    fluid.project();
    let second_divergence = fluid.divergence().norm();
    let twice = fluid.velocity.clone();

    assert!(
        first_divergence < 0.5 * initial_divergence,
        "divergence {initial_divergence} -> {first_divergence}"
    );
    assert!(second_divergence <= first_divergence);

    // projection never adds energy
    assert!(once.norm() <= initial.norm());
    assert!(twice.norm() <= once.norm());

    let first_change = (&once - &initial).norm();
    let second_change = (&twice - &once).norm();
    assert!(
        second_change < 0.25 * first_change,
        "first change {first_change}, second change {second_change}"
    );
}

/// Test that projecting a still fluid leaves it still
#[test]
fn test_projection_of_zero_field() {
    let mut fluid = FluidState::new(&[6, 7, 5], 0.01, ["dye"]).unwrap();
    fluid.project();
    assert!(fluid.velocity.iter().all(|&v| v == 0.0));
}

/// Test that a jet scene stays bounded over 200 frames
#[test]
fn test_velocity_stays_bounded() {
    let config = SceneConfig {
        resolution: [16, 16],
        viscosity: 1e-3,
        duration: 200,
        inflow_padding: 2,
        inflow_duration: 59,
        inflow_radius: 1.5,
        inflow_velocity: 0.2,
        solver: SolverKind::Cholesky,
    };
    let mut scene = Scene::new(config).unwrap();
    while !scene.is_finished() {
        let stats = scene.step();
        assert!(stats.max_speed.is_finite(), "frame {}", stats.frame);
        assert!(
            stats.max_speed < 20.0,
            "frame {}: max speed {}",
            stats.frame,
            stats.max_speed
        );
    }
    for (label, field) in scene.fluid().quantities.iter() {
        assert!(field.iter().all(|v| v.is_finite()), "channel {label}");
    }
}

/// Test that the default jet scene at full inflow strength stays bounded and
/// settles once the inflow stops
#[test]
fn test_strong_jets_stay_bounded() {
    let config = SceneConfig {
        resolution: [64, 64],
        viscosity: 1e-3,
        duration: 200,
        inflow_padding: 12,
        inflow_duration: 60,
        inflow_radius: 4.0,
        inflow_velocity: 1.0,
        solver: SolverKind::Cholesky,
    };
    let mut scene = Scene::new(config).unwrap();
    let mut last = 0.0;
    while !scene.is_finished() {
        let stats = scene.step();
        assert!(
            stats.max_speed < 10.0,
            "frame {}: max speed {}",
            stats.frame,
            stats.max_speed
        );
        last = stats.max_speed;
    }
    assert!(last < 2.0, "final max speed {last}");
}

/// Test that a strong random field without inflow decays instead of feeding
/// on the boundary
#[test]
fn test_random_field_decays() {
    for magnitude in [5.0, 50.0] {
        let mut fluid = FluidState::new(&[20, 20], 0.0, ["dye"]).unwrap();
        for k in 0..fluid.size() {
            for axis in 0..2 {
                fluid.velocity[(k, axis)] = magnitude * noise(2 * k + axis);
            }
        }
        let start = fluid.max_speed();
        for step in 0..300 {
            fluid.step();
            let speed = fluid.max_speed();
            assert!(
                speed <= 1.5 * start,
                "magnitude {magnitude}, step {step}: {speed} from {start}"
            );
        }
        assert!(fluid.max_speed() < 0.5 * start);
    }
}

/// Test that higher-accuracy stencils also produce a working solver
#[test]
fn test_fourth_order_operators() {
    let config = FluidConfig {
        viscosity: 0.05,
        accuracy: 2,
        ..FluidConfig::default()
    };
    let mut fluid = FluidState::with_config(&[12, 12], config, ["dye"]).unwrap();
    let v0 = gaussian(&fluid, [6.0, 6.0], 6.0, 0.8);
    for k in 0..fluid.size() {
        fluid.velocity[(k, 0)] = v0[k];
    }
    fluid.advect_diffuse();
    let before = fluid.divergence().norm();
    fluid.project();
    assert!(fluid.max_speed().is_finite());
    assert!(fluid.divergence().norm() < before);
}
