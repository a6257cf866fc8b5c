//! The active editing mode and the pointer gestures it enables.
//!
//! Exactly one tool is active. Switching tools runs the old tool's exit
//! effects and the new tool's entry effects on the engine; the switch itself
//! never writes history, only the operations a tool performs do.

mod brush;

pub use brush::{BrushSettings, StrokeCapture};

use egui::{CursorIcon, Pos2, Vec2};
use serde::{Deserialize, Serialize};

use crate::document::{ObjectId, ObjectKind};
use crate::engine::{CanvasEngine, CropHandle};
use crate::error::{EditorError, EditorResult};

/// Text placed by the text tool before the user types anything
pub const PLACEHOLDER_TEXT: &str = "Edit text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Transform,
    Crop,
    Draw,
    Text,
    Filter,
    BackgroundRemove,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Select,
        ToolKind::Pan,
        ToolKind::Transform,
        ToolKind::Crop,
        ToolKind::Draw,
        ToolKind::Text,
        ToolKind::Filter,
        ToolKind::BackgroundRemove,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Pan => "Pan",
            ToolKind::Transform => "Transform",
            ToolKind::Crop => "Crop",
            ToolKind::Draw => "Draw",
            ToolKind::Text => "Text",
            ToolKind::Filter => "Filters",
            ToolKind::BackgroundRemove => "Remove background",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ToolKind::Select => "⬉",
            ToolKind::Pan => "✋",
            ToolKind::Transform => "⟲",
            ToolKind::Crop => "✂",
            ToolKind::Draw => "✏",
            ToolKind::Text => "T",
            ToolKind::Filter => "◐",
            ToolKind::BackgroundRemove => "☁",
        }
    }
}

/// A pointer position in screen space and in logical canvas space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub screen: Pos2,
    pub canvas: Pos2,
}

impl Pointer {
    pub fn new(screen: Pos2, canvas: Pos2) -> Self {
        Self { screen, canvas }
    }

    /// Screen and canvas coincide (zoom 1, no pan)
    pub fn at(pos: Pos2) -> Self {
        Self::new(pos, pos)
    }
}

/// Gesture attached between pointer down and pointer up
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Pan { last: Pos2 },
    Move { id: ObjectId, last: Pos2 },
    Crop { handle: CropHandle, last: Pos2 },
    Stroke(StrokeCapture),
}

#[derive(Debug, Default)]
pub struct ToolController {
    active: ToolKind,
    pan_modifier: bool,
    /// Interactivity to restore once panning ends
    interactive_before_pan: Option<bool>,
    brush: BrushSettings,
    gesture: Option<Gesture>,
    /// Text object in its edit sub-state
    editing_text: Option<ObjectId>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ToolKind {
        self.active
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = brush;
    }

    pub fn editing_text(&self) -> Option<ObjectId> {
        self.editing_text
    }

    pub fn is_panning(&self) -> bool {
        self.active == ToolKind::Pan || self.pan_modifier
    }

    pub fn has_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    /// Points of the stroke being drawn, for the live preview
    pub fn stroke_preview(&self) -> Option<&[Pos2]> {
        match &self.gesture {
            Some(Gesture::Stroke(capture)) => Some(capture.points()),
            _ => None,
        }
    }

    /// Switch tools. A tool whose entry needs a document is refused without
    /// touching the current tool or the engine.
    pub fn set_tool(&mut self, tool: ToolKind, engine: &mut CanvasEngine) -> EditorResult<()> {
        if matches!(tool, ToolKind::Crop | ToolKind::Text) && !engine.has_document() {
            return Err(EditorError::NoDocument);
        }
        self.abort_gesture(engine)?;
        let previous = self.active;

        // Exit effects
        if tool != ToolKind::Crop && engine.is_cropping() {
            engine.cancel_crop();
        }
        if previous == ToolKind::Text && tool != ToolKind::Text {
            self.editing_text = None;
        }
        self.active = tool;
        if previous == ToolKind::Pan && !self.is_panning() {
            self.end_pan(engine);
        }

        // Entry effects
        match tool {
            ToolKind::Crop => engine.crop_image()?,
            ToolKind::Pan => self.start_pan(engine),
            ToolKind::Text if previous != ToolKind::Text || self.editing_text.is_none() => {
                let id = engine.add_text(PLACEHOLDER_TEXT, None)?;
                self.editing_text = Some(id);
            }
            _ => {}
        }
        if previous != tool {
            log::info!("Tool {:?} -> {:?}", previous, tool);
        }
        Ok(())
    }

    /// Hold or release the transient pan modifier (space bar)
    pub fn set_pan_modifier(&mut self, held: bool, engine: &mut CanvasEngine) {
        if self.pan_modifier == held {
            return;
        }
        self.pan_modifier = held;
        if held {
            self.start_pan(engine);
        } else if self.active != ToolKind::Pan {
            if matches!(self.gesture, Some(Gesture::Pan { .. })) {
                self.gesture = None;
            }
            self.end_pan(engine);
        }
    }

    fn start_pan(&mut self, engine: &mut CanvasEngine) {
        if self.interactive_before_pan.is_none() {
            self.interactive_before_pan = Some(engine.base_interactive());
            engine.set_interactive(false);
        }
    }

    fn end_pan(&mut self, engine: &mut CanvasEngine) {
        if let Some(interactive) = self.interactive_before_pan.take() {
            engine.set_interactive(interactive);
        }
    }

    /// Drop an unfinished gesture. A move already applied is still committed.
    fn abort_gesture(&mut self, engine: &mut CanvasEngine) -> EditorResult<()> {
        match self.gesture.take() {
            Some(Gesture::Move { .. }) => engine.commit_interaction(),
            _ => Ok(()),
        }
    }

    pub fn pointer_down(&mut self, pointer: Pointer, engine: &mut CanvasEngine) -> EditorResult<()> {
        self.abort_gesture(engine)?;
        if self.is_panning() {
            self.gesture = Some(Gesture::Pan { last: pointer.screen });
            return Ok(());
        }
        match self.active {
            ToolKind::Crop => {
                if let Some(handle) = engine.crop_handle_at(pointer.canvas) {
                    self.gesture = Some(Gesture::Crop {
                        handle,
                        last: pointer.canvas,
                    });
                }
            }
            ToolKind::Draw => {
                if engine.has_document() {
                    self.gesture = Some(Gesture::Stroke(StrokeCapture::start(pointer.canvas)));
                }
            }
            ToolKind::Pan => {}
            tool => {
                let hit = engine.hit_test(pointer.canvas);
                engine.select(hit)?;
                if tool == ToolKind::Text {
                    self.editing_text = hit.filter(|id| {
                        engine
                            .document()
                            .and_then(|d| d.get(*id))
                            .is_some_and(|o| matches!(o.kind, ObjectKind::Text(_)))
                    });
                }
                if let Some(id) = hit {
                    if matches!(tool, ToolKind::Select | ToolKind::Transform | ToolKind::Text) {
                        engine.begin_interaction();
                        self.gesture = Some(Gesture::Move {
                            id,
                            last: pointer.canvas,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, pointer: Pointer, engine: &mut CanvasEngine) -> EditorResult<()> {
        match &mut self.gesture {
            Some(Gesture::Pan { last }) => {
                let delta = pointer.screen - *last;
                *last = pointer.screen;
                if delta != Vec2::ZERO {
                    engine.pan_by(delta);
                }
            }
            Some(Gesture::Move { id, last }) => {
                let delta = pointer.canvas - *last;
                *last = pointer.canvas;
                if delta != Vec2::ZERO {
                    engine.translate(*id, delta)?;
                }
            }
            Some(Gesture::Crop { handle, last }) => {
                let delta = pointer.canvas - *last;
                *last = pointer.canvas;
                engine.drag_crop(*handle, delta)?;
            }
            Some(Gesture::Stroke(capture)) => capture.add_point(pointer.canvas),
            None => {}
        }
        Ok(())
    }

    /// Release the gesture, committing at most one history entry
    pub fn pointer_up(&mut self, pointer: Pointer, engine: &mut CanvasEngine) -> EditorResult<()> {
        self.pointer_move(pointer, engine)?;
        match self.gesture.take() {
            Some(Gesture::Move { .. }) => engine.commit_interaction(),
            Some(Gesture::Stroke(capture)) => {
                let brush = self.brush;
                engine.add_stroke(capture.points(), brush.color, brush.width, brush.eraser)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Replace the content of the text object being edited
    pub fn commit_text(&mut self, content: &str, engine: &mut CanvasEngine) -> EditorResult<()> {
        match self.editing_text {
            Some(id) => engine.set_text_content(id, content),
            None => Ok(()),
        }
    }

    pub fn finish_text_editing(&mut self) {
        self.editing_text = None;
    }

    pub fn cursor(&self) -> CursorIcon {
        if self.is_panning() {
            return if matches!(self.gesture, Some(Gesture::Pan { .. })) {
                CursorIcon::Grabbing
            } else {
                CursorIcon::Grab
            };
        }
        match (&self.gesture, self.active) {
            (Some(Gesture::Move { .. }), _) => CursorIcon::Move,
            (Some(Gesture::Crop { .. }), _) => CursorIcon::Crosshair,
            (_, ToolKind::Crop | ToolKind::Draw) => CursorIcon::Crosshair,
            (_, ToolKind::Text) => CursorIcon::Text,
            (_, ToolKind::BackgroundRemove) => CursorIcon::PointingHand,
            _ => CursorIcon::Default,
        }
    }
}
