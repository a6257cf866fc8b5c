use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// Handle of the crop rectangle being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    Move,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Screen-independent radius around a corner that grabs it, in logical pixels
const HANDLE_RADIUS: f32 = 12.0;

/// Transient crop overlay. It never enters the document or its history.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSession {
    rect: Rect,
    /// Interactivity before the crop started, restored when it ends
    pub(crate) was_interactive: bool,
}

impl CropSession {
    /// Start with the canvas inset by 10% on every side
    pub fn new(canvas: Rect, was_interactive: bool) -> Self {
        Self {
            rect: canvas.shrink2(canvas.size() * 0.1),
            was_interactive,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        // Dragging a corner past the opposite one flips the rectangle
        self.rect = Rect::from_two_pos(rect.min, rect.max);
    }

    /// Which part of the overlay a pointer at `pos` would grab
    pub fn handle_at(&self, pos: Pos2) -> Option<CropHandle> {
        let corners = [
            (self.rect.left_top(), CropHandle::TopLeft),
            (self.rect.right_top(), CropHandle::TopRight),
            (self.rect.left_bottom(), CropHandle::BottomLeft),
            (self.rect.right_bottom(), CropHandle::BottomRight),
        ];
        for (corner, handle) in corners {
            if (corner - pos).length() <= HANDLE_RADIUS {
                return Some(handle);
            }
        }
        self.rect.contains(pos).then_some(CropHandle::Move)
    }

    /// Drag `handle` by `delta` logical pixels
    pub fn drag(&mut self, handle: CropHandle, delta: Vec2) {
        let r = self.rect;
        let next = match handle {
            CropHandle::Move => r.translate(delta),
            CropHandle::TopLeft => Rect::from_two_pos(r.min + delta, r.max),
            CropHandle::TopRight => Rect::from_two_pos(
                pos2(r.min.x, r.min.y + delta.y),
                pos2(r.max.x + delta.x, r.max.y),
            ),
            CropHandle::BottomLeft => Rect::from_two_pos(
                pos2(r.min.x + delta.x, r.min.y),
                pos2(r.max.x, r.max.y + delta.y),
            ),
            CropHandle::BottomRight => Rect::from_two_pos(r.min, r.max + delta),
        };
        self.rect = next;
    }

    /// Integer crop bounds: the rounded rectangle clipped to the canvas
    pub fn bounds(&self, canvas: Rect) -> Rect {
        let rounded = Rect::from_min_max(
            pos2(self.rect.min.x.round(), self.rect.min.y.round()),
            pos2(self.rect.max.x.round(), self.rect.max.y.round()),
        );
        let clipped = rounded.intersect(canvas);
        if clipped.is_positive() {
            clipped
        } else {
            Rect::from_min_size(rounded.min, vec2(clipped.width().max(0.0), clipped.height().max(0.0)))
        }
    }
}
