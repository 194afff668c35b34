use eframe::egui;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::scene::{FrameStats, Scene, SceneConfig};
use crate::solver::SolverKind;
use crate::utils::drawing::{self, RenderMode};
use crate::views::FieldView;

/// Viewer with the simulation running in a background thread.
pub struct App {
    simulation_running: Arc<AtomicBool>,
    simulation_state: Arc<Mutex<SimulationState>>,
    /// Edited in the side panel, applied on reset.
    pending_config: SceneConfig,
    render_mode: RenderMode,
    show_inflows: bool,
    field_view: FieldView,
    /// Set while a new scene is being factorized on a worker thread.
    resetting: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
}

/// Everything the simulation thread touches.
pub struct SimulationState {
    pub scene: Scene,
    pub last_stats: Option<FrameStats>,
}

impl SimulationState {
    pub fn new(config: SceneConfig) -> Result<Self> {
        Ok(Self {
            scene: Scene::new(config)?,
            last_stats: None,
        })
    }

    /// Advances one frame unless the scene has run its course.
    pub fn advance(&mut self) -> bool {
        if self.scene.is_finished() {
            return false;
        }
        self.last_stats = Some(self.scene.step());
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl App {
    /// Builds the default scene and spawns the simulation thread.
    pub fn new(_cc: &eframe::CreationContext) -> Result<Self> {
        let config = SceneConfig::default();
        let app = Self {
            simulation_running: Arc::new(AtomicBool::new(false)),
            simulation_state: Arc::new(Mutex::new(SimulationState::new(config.clone())?)),
            pending_config: config,
            render_mode: RenderMode::default(),
            show_inflows: true,
            field_view: FieldView::default(),
            resetting: Arc::new(AtomicBool::new(false)),
            last_error: Arc::new(Mutex::new(None)),
        };

        let simulation_state = Arc::clone(&app.simulation_state);
        let simulation_running = Arc::clone(&app.simulation_running);

        thread::spawn(move || loop {
            if simulation_running.load(Ordering::Relaxed) {
                let mut state = lock(&simulation_state);
                if !state.advance() {
                    log::info!("simulation finished after {} frames", state.scene.frame());
                    simulation_running.store(false, Ordering::Relaxed);
                }
            }
            thread::sleep(Duration::from_millis(16));
        });

        Ok(app)
    }

    /// Rebuilds the scene from the pending config on a worker thread.
    fn reset(&mut self, ctx: &egui::Context) {
        self.simulation_running.store(false, Ordering::Relaxed);
        self.resetting.store(true, Ordering::Relaxed);

        let config = self.pending_config.clone();
        let simulation_state = Arc::clone(&self.simulation_state);
        let last_error = Arc::clone(&self.last_error);
        let resetting = Arc::clone(&self.resetting);
        let ctx = ctx.clone();

        thread::spawn(move || {
            match SimulationState::new(config.clone()) {
                Ok(state) => {
                    *lock(&simulation_state) = state;
                    *lock(&last_error) = None;
                    log::info!("scene reset with {config:?}");
                }
                Err(err) => {
                    log::error!("failed to reset scene: {err}");
                    *lock(&last_error) = Some(err.to_string());
                }
            }
            resetting.store(false, Ordering::Relaxed);
            ctx.request_repaint();
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let resetting = self.resetting.load(Ordering::Relaxed);
        ui.vertical(|ui| {
            if ui.add_enabled(!resetting, egui::Button::new("Start")).clicked() {
                self.simulation_running.store(true, Ordering::Relaxed);
            }
            if ui.button("Pause").clicked() {
                self.simulation_running.store(false, Ordering::Relaxed);
            }
            if ui.add_enabled(!resetting, egui::Button::new("Reset")).clicked() {
                self.reset(ui.ctx());
            }
            if resetting {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Factorizing operators");
                });
            }

            ui.separator();
            egui::ComboBox::from_label("Render")
                .selected_text(format!("{:?}", self.render_mode))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.render_mode, RenderMode::Dye, "Dye");
                    ui.selectable_value(&mut self.render_mode, RenderMode::Curl, "Curl");
                });
            ui.checkbox(&mut self.show_inflows, "Show inflows");

            ui.separator();
            ui.label("Scene (applied on reset)");
            let config = &mut self.pending_config;
            ui.add(egui::Slider::new(&mut config.resolution[0], 16..=256).text("Rows"));
            ui.add(egui::Slider::new(&mut config.resolution[1], 16..=256).text("Columns"));
            ui.add(
                egui::Slider::new(&mut config.viscosity, 0.0..=0.1)
                    .logarithmic(true)
                    .text("Viscosity"),
            );
            ui.add(egui::Slider::new(&mut config.duration, 1..=1000).text("Duration"));
            ui.add(egui::Slider::new(&mut config.inflow_duration, 0..=500).text("Inflow Duration"));
            ui.add(egui::Slider::new(&mut config.inflow_radius, 1.0..=16.0).text("Inflow Radius"));
            ui.add(egui::Slider::new(&mut config.inflow_velocity, 0.0..=4.0).text("Inflow Velocity"));
            ui.add(egui::Slider::new(&mut config.inflow_padding, 0..=64).text("Inflow Padding"));
            egui::ComboBox::from_label("Linear Solver")
                .selected_text(format!("{:?}", config.solver))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut config.solver, SolverKind::Cholesky, "Cholesky");
                    ui.selectable_value(
                        &mut config.solver,
                        SolverKind::ConjugateGradient,
                        "Conjugate Gradient",
                    );
                });

            if let Some(err) = lock(&self.last_error).as_deref() {
                ui.colored_label(egui::Color32::RED, err);
            }
        });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("control_panel").show(ctx, |ui| {
            self.controls(ui);
        });

        let (image, log_text) = {
            let state = lock(&self.simulation_state);
            let mut image = drawing::render(&state.scene, self.render_mode);
            if self.show_inflows {
                let length = 2.0 * state.scene.config().inflow_radius;
                drawing::draw_inflows(&mut image, state.scene.inflows(), length, egui::Color32::WHITE);
            }
            let log_text = match &state.last_stats {
                Some(stats) => format!(
                    "Frame: {} / {}, Max speed: {:.3} cells/step, Step time: {:?}",
                    stats.frame + 1,
                    state.scene.config().duration,
                    stats.max_speed,
                    stats.elapsed,
                ),
                None => format!("Frame: 0 / {}", state.scene.config().duration),
            };
            (image, log_text)
        };

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.separator();
            ui.label(log_text);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.field_view.show(ui, ctx, image);
        });

        // Keep repainting while frames are being produced.
        if self.simulation_running.load(Ordering::Relaxed) {
            ctx.request_repaint();
        }
    }
}
