use egui::{Sense, Ui};
use std::cell::Cell;
use std::rc::Rc;

use crate::document::{Document, ObjectId};
use crate::engine::CanvasEngine;
use crate::error::{EditorError, EditorResult};
use crate::event::EditorEvent;

/// One row of the layer list. `id` is `None` for the background pseudo-layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub id: Option<ObjectId>,
    pub name: String,
    pub kind: &'static str,
    pub visible: bool,
    pub locked: bool,
    pub selected: bool,
}

impl LayerEntry {
    pub fn is_background(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Default)]
struct Flags {
    dirty: Cell<bool>,
    /// Set between `RestoreStarted` and `RestoreFinished`
    suspended: Cell<bool>,
}

impl Flags {
    fn observe(&self, event: &EditorEvent) {
        match event {
            EditorEvent::RestoreStarted => self.suspended.set(true),
            EditorEvent::RestoreFinished => {
                self.suspended.set(false);
                self.dirty.set(true);
            }
            EditorEvent::SelectionChanged(_) => self.dirty.set(true),
            event if event.is_structural() => self.dirty.set(true),
            _ => {}
        }
    }
}

/// Ordered view of the document's objects, topmost first, with the
/// background pseudo-layer always last.
///
/// Rebuilds are deferred while an undo/redo is replacing the graph.
#[derive(Debug)]
pub struct LayerPanel {
    flags: Rc<Flags>,
    entries: Vec<LayerEntry>,
    rebuilds: u64,
}

impl LayerPanel {
    /// Create the panel and subscribe it to `engine`
    pub fn attach(engine: &CanvasEngine) -> Self {
        let panel = Self::detached();
        let flags = Rc::clone(&panel.flags);
        engine.subscribe(Box::new(move |event: &EditorEvent| flags.observe(event)));
        panel
    }

    /// A panel fed through [`Self::observe`] only
    pub fn detached() -> Self {
        let flags = Flags::default();
        flags.dirty.set(true);
        Self {
            flags: Rc::new(flags),
            entries: Vec::new(),
            rebuilds: 0,
        }
    }

    pub fn observe(&self, event: &EditorEvent) {
        self.flags.observe(event);
    }

    pub fn is_suspended(&self) -> bool {
        self.flags.suspended.get()
    }

    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    /// How many times the list has been rebuilt
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Rebuild the list if it is stale. Returns whether it was rebuilt.
    pub fn refresh(&mut self, engine: &CanvasEngine) -> bool {
        if self.is_suspended() || !self.flags.dirty.get() {
            return false;
        }
        self.entries = match engine.document() {
            Some(document) => build_entries(document, engine.selected()),
            None => Vec::new(),
        };
        self.flags.dirty.set(false);
        self.rebuilds += 1;
        true
    }

    fn entry(&self, index: usize) -> EditorResult<&LayerEntry> {
        self.entries
            .get(index)
            .ok_or(EditorError::NoSuchLayer(index))
    }

    fn object_at(&self, index: usize) -> EditorResult<ObjectId> {
        self.entry(index)?.id.ok_or(EditorError::BackgroundLayer)
    }

    /// Number of rows above the background entry
    fn content_rows(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_background()).count()
    }

    pub fn select(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.entry(index)?.id;
        engine.select(id)
    }

    pub fn toggle_visible(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(index)?;
        let visible = self.entries[index].visible;
        engine.set_visible(id, !visible)
    }

    pub fn toggle_locked(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(index)?;
        let locked = self.entries[index].locked;
        engine.set_locked(id, !locked)
    }

    pub fn duplicate(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<ObjectId> {
        let id = self.object_at(index)?;
        engine.duplicate(id)
    }

    pub fn delete(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(index)?;
        engine.delete(id)
    }

    /// Move the row one step toward the top of the list
    pub fn move_up(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(index)?;
        engine.bring_forward(id)
    }

    pub fn move_down(&mut self, index: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(index)?;
        engine.send_backward(id)
    }

    /// Drag-and-drop: put row `from` at row `to`. Rows past the last content
    /// row land just above the background.
    pub fn drop_at(&mut self, from: usize, to: usize, engine: &mut CanvasEngine) -> EditorResult<()> {
        let id = self.object_at(from)?;
        let rows = self.content_rows();
        let to = to.min(rows.saturating_sub(1));
        let len = engine.document().ok_or(EditorError::NoDocument)?.objects.len();
        engine.move_to_index(id, len - 1 - to)
    }
}

fn build_entries(document: &Document, selected: Option<ObjectId>) -> Vec<LayerEntry> {
    let mut entries: Vec<LayerEntry> = document
        .content_objects()
        .rev()
        .map(|object| LayerEntry {
            id: Some(object.id),
            name: object.name.clone(),
            kind: object.kind_name(),
            visible: object.visible,
            locked: object.locked,
            selected: selected == Some(object.id),
        })
        .collect();
    entries.push(LayerEntry {
        id: None,
        name: "Background".to_owned(),
        kind: "background",
        visible: true,
        locked: true,
        selected: selected.is_none(),
    });
    entries
}

#[derive(Debug, Clone, Copy)]
enum RowAction {
    Select,
    ToggleVisible,
    ToggleLocked,
    Duplicate,
    Delete,
    Up,
    Down,
    Drop { to: usize },
}

/// Draw the layer list and route clicks back to the engine
pub fn layers_panel(ui: &mut Ui, panel: &mut LayerPanel, engine: &mut CanvasEngine) {
    ui.heading("Layers");
    panel.refresh(engine);

    let mut action: Option<(usize, RowAction)> = None;
    let rows = panel.content_rows();
    egui::ScrollArea::vertical().show(ui, |ui| {
        for (index, entry) in panel.entries().iter().enumerate() {
            let row = ui.horizontal(|ui| {
                if entry.is_background() {
                    ui.label("▭");
                } else {
                    let eye = if entry.visible { "👁" } else { "—" };
                    if ui.small_button(eye).on_hover_text("Show / hide").clicked() {
                        action = Some((index, RowAction::ToggleVisible));
                    }
                    let lock = if entry.locked { "🔒" } else { "🔓" };
                    if ui.small_button(lock).on_hover_text("Lock / unlock").clicked() {
                        action = Some((index, RowAction::ToggleLocked));
                    }
                }
                let label = ui.selectable_label(entry.selected, &entry.name);
                if label.clicked() {
                    action = Some((index, RowAction::Select));
                }
                if !entry.is_background() {
                    if index > 0 && ui.small_button("⏶").clicked() {
                        action = Some((index, RowAction::Up));
                    }
                    if index + 1 < rows && ui.small_button("⏷").clicked() {
                        action = Some((index, RowAction::Down));
                    }
                    if ui.small_button("⧉").on_hover_text("Duplicate").clicked() {
                        action = Some((index, RowAction::Duplicate));
                    }
                    if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                        action = Some((index, RowAction::Delete));
                    }
                }
            });

            if !entry.is_background() {
                let response = ui.interact(row.response.rect, row.response.id.with("drag"), Sense::drag());
                if response.drag_stopped() {
                    if let Some(pointer) = ui.ctx().pointer_latest_pos() {
                        let height = row.response.rect.height().max(1.0);
                        let shift = ((pointer.y - row.response.rect.center().y) / height).round() as isize;
                        let to = (index as isize + shift).max(0) as usize;
                        action = Some((index, RowAction::Drop { to }));
                    }
                }
            }
        }
    });

    let Some((index, action)) = action else {
        return;
    };
    let result = match action {
        RowAction::Select => panel.select(index, engine),
        RowAction::ToggleVisible => panel.toggle_visible(index, engine),
        RowAction::ToggleLocked => panel.toggle_locked(index, engine),
        RowAction::Duplicate => panel.duplicate(index, engine).map(|_| ()),
        RowAction::Delete => panel.delete(index, engine),
        RowAction::Up => panel.move_up(index, engine),
        RowAction::Down => panel.move_down(index, engine),
        RowAction::Drop { to } => panel.drop_at(index, to, engine),
    };
    if let Err(err) = result {
        log::warn!("Layer action failed: {}", err);
    }
}
