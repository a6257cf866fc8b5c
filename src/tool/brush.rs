use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};

/// Smallest distance between captured stroke points, in logical pixels
const MIN_POINT_SPACING: f32 = 0.5;

/// Settings the draw tool captures strokes with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub color: Color32,
    pub width: f32,
    /// Erase instead of painting
    pub eraser: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            width: 5.0,
            eraser: false,
        }
    }
}

/// Points of a freehand stroke being drawn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeCapture {
    points: Vec<Pos2>,
}

impl StrokeCapture {
    pub fn start(pos: Pos2) -> Self {
        Self { points: vec![pos] }
    }

    pub fn add_point(&mut self, pos: Pos2) {
        let far_enough = self
            .points
            .last()
            .is_none_or(|last| (*last - pos).length() >= MIN_POINT_SPACING);
        if far_enough {
            self.points.push(pos);
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }
}
