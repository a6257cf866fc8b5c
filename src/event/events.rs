use egui::Vec2;

use crate::document::ObjectId;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A new document replaced the previous one
    DocumentLoaded {
        width: u32,
        height: u32,
    },
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ObjectModified(ObjectId),
    ObjectsReordered,
    /// `None` means the background pseudo-layer is selected
    SelectionChanged(Option<ObjectId>),
    CanvasResized {
        width: u32,
        height: u32,
    },
    HistoryChanged {
        index: isize,
        len: usize,
    },
    /// An undo/redo is about to replace the object graph
    RestoreStarted,
    /// The replacement finished; the graph is consistent again
    RestoreFinished,
    ViewChanged {
        zoom: f32,
        pan: Vec2,
    },
    CropStarted,
    CropFinished {
        applied: bool,
    },
    InteractivityChanged(bool),
}

impl EditorEvent {
    /// Whether the event describes a change to the object graph
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EditorEvent::DocumentLoaded { .. }
                | EditorEvent::ObjectAdded(_)
                | EditorEvent::ObjectRemoved(_)
                | EditorEvent::ObjectModified(_)
                | EditorEvent::ObjectsReordered
                | EditorEvent::CanvasResized { .. }
        )
    }
}
