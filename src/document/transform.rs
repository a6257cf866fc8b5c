use egui::{Pos2, Rect, Vec2, pos2};
use serde::{Deserialize, Serialize};

/// Row-major 2D affine matrix in homogeneous form
pub type Matrix = [[f32; 3]; 3];

pub const IDENTITY: Matrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Placement of an object in its parent's coordinate space.
///
/// The local origin (0, 0) lands at `(left, top)`. Scale is applied first,
/// then rotation (degrees, clockwise on screen), then translation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub left: f32,
    pub top: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Rotation in degrees
    pub angle: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }
}

impl Transform {
    pub fn at(position: Pos2) -> Self {
        Self {
            left: position.x,
            top: position.y,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Pos2 {
        pos2(self.left, self.top)
    }

    pub fn scale(&self) -> Vec2 {
        Vec2::new(self.scale_x, self.scale_y)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.left += delta.x;
        self.top += delta.y;
    }

    /// Local-to-parent matrix
    pub fn to_matrix(&self) -> Matrix {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let scale = [
            [self.scale_x, 0.0, 0.0],
            [0.0, self.scale_y, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let rotate = [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]];
        let translate = [[1.0, 0.0, self.left], [0.0, 1.0, self.top], [0.0, 0.0, 1.0]];
        multiply_matrices(&translate, &multiply_matrices(&rotate, &scale))
    }
}

const fn const_multiply_matrices(a: &Matrix, b: &Matrix) -> Matrix {
    let mut result = [[0.0; 3]; 3];
    let mut i = 0;
    while i < 3 {
        let mut j = 0;
        while j < 3 {
            let mut k = 0;
            while k < 3 {
                result[i][j] += a[i][k] * b[k][j];
                k += 1;
            }
            j += 1;
        }
        i += 1;
    }
    result
}

pub fn multiply_matrices(a: &Matrix, b: &Matrix) -> Matrix {
    const_multiply_matrices(a, b)
}

pub fn apply(m: &Matrix, p: Pos2) -> Pos2 {
    pos2(
        m[0][0] * p.x + m[0][1] * p.y + m[0][2],
        m[1][0] * p.x + m[1][1] * p.y + m[1][2],
    )
}

/// Inverse of an affine matrix, or `None` when it is degenerate (zero scale)
pub fn invert(m: &Matrix) -> Option<Matrix> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < f32::EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let a = m[1][1] * inv_det;
    let b = -m[0][1] * inv_det;
    let c = -m[1][0] * inv_det;
    let d = m[0][0] * inv_det;
    let tx = -(a * m[0][2] + b * m[1][2]);
    let ty = -(c * m[0][2] + d * m[1][2]);
    Some([[a, b, tx], [c, d, ty], [0.0, 0.0, 1.0]])
}

/// Axis-aligned bounds of `rect` after mapping it through `m`
pub fn map_rect(m: &Matrix, rect: Rect) -> Rect {
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.left_bottom(),
        rect.right_bottom(),
    ];
    let mut bounds = Rect::NOTHING;
    for corner in corners {
        bounds.extend_with(apply(m, corner));
    }
    bounds
}
