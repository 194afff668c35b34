/// Uploads rendered frames to a texture and paints them with the grid's
/// aspect ratio preserved.
#[derive(Default)]
pub struct FieldView {
    texture: Option<egui::TextureHandle>,
}

impl FieldView {
    pub fn show(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, image: egui::ColorImage) {
        let [width, height] = image.size;
        if width == 0 || height == 0 {
            return;
        }
        let img_size = fit(ui.available_rect_before_wrap().size(), width as f32 / height as f32);

        // Nearest filtering keeps individual cells visible.
        let options = egui::TextureOptions {
            magnification: egui::TextureFilter::Nearest,
            minification: egui::TextureFilter::Nearest,
            mipmap_mode: Some(egui::TextureFilter::Nearest),
            wrap_mode: egui::TextureWrapMode::ClampToEdge,
        };

        if let Some(texture) = &mut self.texture {
            texture.set(image, options);
        } else {
            self.texture = Some(ctx.load_texture("fluid", image, options));
        }

        if let Some(texture) = &self.texture {
            ui.image((texture.id(), img_size));
        }
    }
}

/// Largest size with the given aspect ratio that fits in `available`.
fn fit(available: egui::Vec2, domain_aspect: f32) -> egui::Vec2 {
    let available_aspect = available.x / available.y;
    if available_aspect > domain_aspect {
        egui::Vec2::new(available.y * domain_aspect, available.y)
    } else {
        egui::Vec2::new(available.x, available.x / domain_aspect)
    }
}
