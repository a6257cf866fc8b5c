use egui::{Vec2, vec2};

use super::CanvasEngine;
use crate::document::ObjectId;
use crate::error::{EditorError, EditorResult};
use crate::event::EditorEvent;

/// Where `align` moves an object on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    CenterH,
    Right,
    Top,
    CenterV,
    Bottom,
}

impl Alignment {
    pub const ALL: [Alignment; 6] = [
        Alignment::Left,
        Alignment::CenterH,
        Alignment::Right,
        Alignment::Top,
        Alignment::CenterV,
        Alignment::Bottom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Alignment::Left => "Align left",
            Alignment::CenterH => "Center horizontally",
            Alignment::Right => "Align right",
            Alignment::Top => "Align top",
            Alignment::CenterV => "Center vertically",
            Alignment::Bottom => "Align bottom",
        }
    }
}

impl CanvasEngine {
    /// Index of a content object, refusing the background
    fn content_index(&self, id: ObjectId) -> EditorResult<usize> {
        let document = self.document_ref()?;
        let index = document.index_of(id).ok_or(EditorError::ObjectNotFound(id))?;
        if document.objects[index].is_background() {
            return Err(EditorError::BackgroundLayer);
        }
        Ok(index)
    }

    /// Snap the object's bounding box to a canvas edge or center line
    pub fn align(&mut self, id: ObjectId, alignment: Alignment) -> EditorResult<()> {
        let index = self.content_index(id)?;
        let document = self.document_ref()?;
        let object = &document.objects[index];
        if object.locked {
            return Err(EditorError::ObjectLocked(id));
        }
        let canvas = document.rect();
        let bounds = object.bounding_rect();
        let delta: Vec2 = match alignment {
            Alignment::Left => vec2(canvas.left() - bounds.left(), 0.0),
            Alignment::CenterH => vec2(canvas.center().x - bounds.center().x, 0.0),
            Alignment::Right => vec2(canvas.right() - bounds.right(), 0.0),
            Alignment::Top => vec2(0.0, canvas.top() - bounds.top()),
            Alignment::CenterV => vec2(0.0, canvas.center().y - bounds.center().y),
            Alignment::Bottom => vec2(0.0, canvas.bottom() - bounds.bottom()),
        };
        if delta == Vec2::ZERO {
            return Ok(());
        }
        self.document_mut()?.objects[index].transform.translate(delta);
        self.commit(EditorEvent::ObjectModified(id))
    }

    /// Move a content object to z-index `target`, clamped above the background
    pub fn move_to_index(&mut self, id: ObjectId, target: usize) -> EditorResult<()> {
        let from = self.content_index(id)?;
        let document = self.document_mut()?;
        let lowest = document.first_content_index();
        let to = target.clamp(lowest, document.objects.len() - 1);
        if from == to {
            return Ok(());
        }
        let object = document.objects.remove(from);
        document.objects.insert(to, object);
        log::debug!("Moved {} from z {} to {}", id, from, to);
        self.commit(EditorEvent::ObjectsReordered)
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> EditorResult<()> {
        let index = self.content_index(id)?;
        self.move_to_index(id, index + 1)
    }

    pub fn send_backward(&mut self, id: ObjectId) -> EditorResult<()> {
        let index = self.content_index(id)?;
        self.move_to_index(id, index.saturating_sub(1))
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> EditorResult<()> {
        self.content_index(id)?;
        self.move_to_index(id, usize::MAX)
    }

    pub fn send_to_back(&mut self, id: ObjectId) -> EditorResult<()> {
        self.content_index(id)?;
        self.move_to_index(id, 0)
    }

    /// Z-index of an object (0 is the bottom of the stack)
    pub fn z_index(&self, id: ObjectId) -> Option<usize> {
        self.document.as_ref()?.index_of(id)
    }

    pub fn delete(&mut self, id: ObjectId) -> EditorResult<()> {
        let index = self.content_index(id)?;
        let document = self.document_mut()?;
        let removed = document.objects.remove(index);
        let referenced = document.source_ids();
        // Snapshots hold their own references to removed pixels
        self.sources.retain_referenced(&referenced);
        log::debug!("Deleted {} {}", removed.kind_name(), id);
        if self.selection == Some(id) {
            self.selection = None;
            self.emit(EditorEvent::SelectionChanged(None));
        }
        self.commit(EditorEvent::ObjectRemoved(id))
    }

    /// Deep copy, offset by the configured delta and placed directly above the original
    pub fn duplicate(&mut self, id: ObjectId) -> EditorResult<ObjectId> {
        let index = self.content_index(id)?;
        let offset = Vec2::splat(self.config.duplicate_offset);
        let document = self.document_mut()?;
        let mut copy = document.objects[index].clone();
        copy.regenerate_ids();
        copy.transform.translate(offset);
        copy.name = format!("{} copy", copy.name);
        let copy_id = copy.id;
        document.objects.insert(index + 1, copy);
        self.commit(EditorEvent::ObjectAdded(copy_id))?;
        self.select(Some(copy_id))?;
        Ok(copy_id)
    }
}
