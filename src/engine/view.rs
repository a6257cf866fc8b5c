use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// On-screen presentation of the logical canvas.
///
/// Zoom only scales the rendered surface: object geometry stays in logical
/// pixels whatever the zoom factor is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub zoom: f32,
    pub pan: Vec2,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub step: f32,
}

impl ViewState {
    pub fn new(min_zoom: f32, max_zoom: f32, step: f32) -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            min_zoom,
            max_zoom,
            step,
        }
    }

    pub fn set_zoom(&mut self, level: f32) {
        if level.is_finite() {
            self.zoom = level.clamp(self.min_zoom, self.max_zoom);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.step);
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }

    /// Largest zoom (never above 1) that fits the canvas into `margin` of the container
    pub fn fit(&mut self, logical: Vec2, container: Vec2, margin: f32) {
        if logical.x <= 0.0 || logical.y <= 0.0 || container.x <= 0.0 || container.y <= 0.0 {
            return;
        }
        let zoom = (margin * container.x / logical.x)
            .min(margin * container.y / logical.y)
            .min(1.0);
        // Not clamped to min_zoom: a fitted canvas must stay inside the container
        self.zoom = zoom.max(f32::EPSILON);
        self.pan = Vec2::ZERO;
    }

    /// On-screen pixel size of a canvas with the given logical size
    pub fn rendered_size(&self, width: u32, height: u32) -> [u32; 2] {
        [
            (width as f32 * self.zoom).round() as u32,
            (height as f32 * self.zoom).round() as u32,
        ]
    }

    /// Screen rectangle of the canvas when centered in `container`
    pub fn canvas_rect(&self, width: u32, height: u32, container: Rect) -> Rect {
        let [w, h] = self.rendered_size(width, height);
        Rect::from_center_size(container.center() + self.pan, vec2(w as f32, h as f32))
    }

    pub fn screen_to_logical(&self, canvas_rect: Rect, screen: Pos2) -> Pos2 {
        let offset = (screen - canvas_rect.min) / self.zoom;
        pos2(offset.x, offset.y)
    }

    pub fn logical_to_screen(&self, canvas_rect: Rect, logical: Pos2) -> Pos2 {
        canvas_rect.min + logical.to_vec2() * self.zoom
    }

    /// Percentage shown in the zoom readout
    pub fn percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}
