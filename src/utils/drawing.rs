use egui::{Color32, ColorImage};

use crate::fluid::{Curl, FluidState, QuantityId};
use crate::scene::{Inflow, Scene};

/// What the viewer paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Dye channels as RGB.
    #[default]
    Dye,
    /// Vorticity as hue, dye density as brightness.
    Curl,
}

/// One pixel per cell: axis 1 runs left to right, axis 0 top to bottom.
fn image_size(fluid: &FluidState) -> [usize; 2] {
    let axes = fluid.shape().axes();
    [axes[1], axes[0]]
}

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Maps up to three dye channels to red, green and blue.
pub fn dye_image(fluid: &FluidState, channels: &[QuantityId]) -> ColorImage {
    let fields: Vec<_> = channels.iter().map(|&id| &fluid.quantities[id]).collect();
    let value = |k: usize, c: usize| fields.get(c).map_or(0.0, |field| field[k]);
    let pixels = (0..fluid.size())
        .map(|k| Color32::from_rgb(channel(value(k, 0)), channel(value(k, 1)), channel(value(k, 2))))
        .collect();
    ColorImage {
        size: image_size(fluid),
        pixels,
    }
}

/// Sigmoid squashing curl into a hue in `[0, 0.5]`.
pub fn curl_hue(curl: f64) -> f32 {
    (((curl * 2.0).tanh() + 1.0) / 4.0) as f32
}

/// Hue from the curl, value from the summed dye.
pub fn curl_image(fluid: &FluidState, channels: &[QuantityId]) -> ColorImage {
    let curl = match fluid.curl() {
        Ok(Curl::Scalar(curl)) => curl,
        _ => nalgebra::DVector::zeros(fluid.size()),
    };
    let pixels = (0..fluid.size())
        .map(|k| {
            let density: f64 = channels.iter().map(|&id| fluid.quantities[id][k]).sum();
            let hsva = egui::ecolor::Hsva::new(curl_hue(curl[k]), 1.0, density.clamp(0.0, 1.0) as f32, 1.0);
            Color32::from(hsva)
        })
        .collect();
    ColorImage {
        size: image_size(fluid),
        pixels,
    }
}

pub fn render(scene: &Scene, mode: RenderMode) -> ColorImage {
    match mode {
        RenderMode::Dye => dye_image(scene.fluid(), scene.channels()),
        RenderMode::Curl => curl_image(scene.fluid(), scene.channels()),
    }
}

/// Marks each inflow with a short line along its direction.
pub fn draw_inflows(image: &mut ColorImage, inflows: &[Inflow], length: f64, color: Color32) {
    for inflow in inflows {
        // image x is grid axis 1, image y is grid axis 0
        let x0 = inflow.center[1].round() as isize;
        let y0 = inflow.center[0].round() as isize;
        let x1 = (inflow.center[1] + inflow.direction[1] * length).round() as isize;
        let y1 = (inflow.center[0] + inflow.direction[0] * length).round() as isize;
        draw_line(image, x0, y0, x1, y1, color);
    }
}

/// Bresenham line, clipped to the image.
pub fn draw_line(image: &mut ColorImage, x0: isize, y0: isize, x1: isize, y1: isize, color: Color32) {
    let [width, height] = image.size;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        if x >= 0 && x < width as isize && y >= 0 && y < height as isize {
            image.pixels[x as usize + y as usize * width] = color;
        }

        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
