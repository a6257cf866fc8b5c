//! The canvas engine owns the document, its pixel sources and the undo
//! history. Everything else (tools, panels, the shell) changes the document
//! only through the engine's methods and observes it through events.

mod arrange;
mod background;
mod crop;
mod history;
mod objects;
mod source;
mod view;

use egui::{Pos2, Rect, Vec2};
use image::RgbaImage;
use std::cell::RefCell;

pub use arrange::Alignment;
pub use background::{
    BackgroundRemovalJob, HttpSegmentationService, LayerTarget, PendingRemoval, SegmentationService,
};
pub use crop::{CropHandle, CropSession};
pub use history::{History, HistorySnapshot};
pub use objects::FilterAdjustment;
pub use source::{ImageSource, SourceStore};
pub use view::ViewState;

use crate::config::EditorConfig;
use crate::document::{
    Background, Document, ImageProvenance, Object, ObjectId, TemplateSpec, factory,
};
use crate::error::{EditorError, EditorResult};
use crate::event::{EditorEvent, EventBus, EventHandler, SubscriptionId};
use crate::render::{self, ExportFormat, FilterCache, FontBook, Renderer};

/// Continuous gesture in progress (drag move, slider drag).
///
/// Changes made meanwhile are flagged instead of recorded; ending the
/// gesture records a single snapshot.
#[derive(Debug, Default, Clone, Copy)]
struct Interaction {
    active: bool,
    dirty: bool,
}

pub struct CanvasEngine {
    config: EditorConfig,
    document: Option<Document>,
    pub(crate) sources: SourceStore,
    history: History,
    view: ViewState,
    crop: Option<CropSession>,
    selection: Option<ObjectId>,
    interactive: bool,
    interaction: Interaction,
    bus: EventBus,
    fonts: FontBook,
    filter_cache: RefCell<FilterCache>,
    revision: u64,
}

impl std::fmt::Debug for CanvasEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasEngine")
            .field("document", &self.document.as_ref().map(|d| (d.width, d.height, d.objects.len())))
            .field("history", &self.history)
            .field("view", &self.view)
            .field("crop", &self.crop)
            .field("selection", &self.selection)
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl CanvasEngine {
    pub fn new(config: EditorConfig) -> Self {
        let fonts = FontBook::from_config(config.text_font.as_deref());
        Self::with_fonts(config, fonts)
    }

    pub fn with_fonts(config: EditorConfig, fonts: FontBook) -> Self {
        Self {
            history: History::new(config.history_capacity),
            view: ViewState::new(config.min_zoom, config.max_zoom, config.zoom_step),
            config,
            document: None,
            sources: SourceStore::default(),
            crop: None,
            selection: None,
            interactive: true,
            interaction: Interaction::default(),
            bus: EventBus::new(),
            fonts,
            filter_cache: RefCell::new(FilterCache::default()),
            revision: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Bumped on every visible change; the UI re-uploads its texture when it moves
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub(crate) fn emit(&self, event: EditorEvent) {
        self.bus.emit(event);
    }

    pub(crate) fn document_ref(&self) -> EditorResult<&Document> {
        self.document.as_ref().ok_or(EditorError::NoDocument)
    }

    pub(crate) fn document_mut(&mut self) -> EditorResult<&mut Document> {
        self.document.as_mut().ok_or(EditorError::NoDocument)
    }

    // ---------------------------------------------------------------------
    // Document lifecycle

    /// Replace the document with a single full-canvas image at the image's native size
    pub fn load_image(&mut self, source: ImageSource) -> EditorResult<()> {
        let pixels = source.decode().inspect_err(|e| log::error!("{}", e))?;
        self.load_pixels(pixels)
    }

    /// Like [`Self::load_image`], fetching remote URLs first
    pub async fn load_image_from(&mut self, source: ImageSource) -> EditorResult<()> {
        let bytes = source.fetch().await?;
        let pixels = source::decode_bytes(&bytes).inspect_err(|e| log::error!("{}", e))?;
        self.load_pixels(pixels)
    }

    pub(crate) fn load_pixels(&mut self, pixels: RgbaImage) -> EditorResult<()> {
        let (width, height) = pixels.dimensions();
        let mut sources = SourceStore::default();
        let source = sources.insert(pixels);
        let mut document = Document::new(width, height);
        document
            .objects
            .push(factory::image(source, width, height, Pos2::ZERO, ImageProvenance::Loaded));
        self.replace_document(document, sources)
    }

    /// Empty document whose background is a dedicated background object
    pub fn create_blank(&mut self, width: u32, height: u32, background: Background) -> EditorResult<()> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidGeometry {
                width: width as f32,
                height: height as f32,
            });
        }
        self.replace_document(
            Document::with_background(width, height, background),
            SourceStore::default(),
        )
    }

    pub fn load_template(&mut self, template: &TemplateSpec) -> EditorResult<()> {
        log::info!("Loading template '{}'", template.name);
        self.create_blank(template.width, template.height, template.background)
    }

    fn replace_document(&mut self, document: Document, sources: SourceStore) -> EditorResult<()> {
        // Capture first so a failure leaves the previous document in place
        let snapshot = HistorySnapshot::capture(&document, &sources)?;
        if let Some(session) = self.crop.take() {
            self.interactive = session.was_interactive;
        }
        let (width, height) = (document.width, document.height);
        self.document = Some(document);
        self.sources = sources;
        self.selection = None;
        self.interaction = Interaction::default();
        self.filter_cache.borrow_mut().clear();
        self.view.reset();
        self.history.clear();
        self.history.record(snapshot);
        self.revision += 1;
        log::info!("Created {}x{} document", width, height);

        self.emit(EditorEvent::DocumentLoaded { width, height });
        self.emit(EditorEvent::SelectionChanged(None));
        self.emit_history();
        Ok(())
    }

    /// Encode the document at logical resolution, whatever the zoom
    pub fn export_image(&self, format: ExportFormat) -> EditorResult<Vec<u8>> {
        let pixels = self.render().ok_or(EditorError::NoDocument)?;
        render::encode(&pixels, format, self.config.jpeg_quality)
    }

    /// The document at logical resolution, or `None` before one exists
    pub fn render(&self) -> Option<RgbaImage> {
        let document = self.document.as_ref()?;
        let mut cache = self.filter_cache.borrow_mut();
        Some(Renderer::new(&self.sources, &self.fonts, &mut cache).render_document(document))
    }

    /// One object in its own space at natural resolution
    pub fn render_object(&self, id: ObjectId) -> EditorResult<RgbaImage> {
        let document = self.document_ref()?;
        let object = document.get(id).ok_or(EditorError::ObjectNotFound(id))?;
        let mut cache = self.filter_cache.borrow_mut();
        let size = object.local_bounds().size();
        Renderer::new(&self.sources, &self.fonts, &mut cache)
            .render_object(object)
            .ok_or(EditorError::InvalidGeometry {
                width: size.x,
                height: size.y,
            })
    }

    // ---------------------------------------------------------------------
    // History

    /// Record a qualifying mutation, or defer it while a gesture is running
    pub(crate) fn commit(&mut self, event: EditorEvent) -> EditorResult<()> {
        self.revision += 1;
        self.emit(event);
        if self.interaction.active {
            self.interaction.dirty = true;
            return Ok(());
        }
        self.record()
    }

    /// A change that never enters history on its own (intermediate drag frames)
    pub(crate) fn touch(&mut self, event: EditorEvent) {
        self.revision += 1;
        self.interaction.dirty = true;
        self.emit(event);
    }

    fn record(&mut self) -> EditorResult<()> {
        if self.history.is_restoring() {
            return Ok(());
        }
        let Some(document) = &self.document else {
            return Ok(());
        };
        let snapshot = HistorySnapshot::capture(document, &self.sources)?;
        if self.history.record(snapshot) {
            log::debug!(
                "snapshot {} of {} recorded",
                self.history.index() + 1,
                self.history.len()
            );
            self.emit_history();
        }
        Ok(())
    }

    fn emit_history(&self) {
        self.emit(EditorEvent::HistoryChanged {
            index: self.history.index(),
            len: self.history.len(),
        });
    }

    /// Start a gesture; mutations until [`Self::commit_interaction`] share one snapshot
    pub fn begin_interaction(&mut self) {
        self.interaction.active = true;
    }

    /// End the gesture, recording one snapshot if anything changed
    pub fn commit_interaction(&mut self) -> EditorResult<()> {
        let was_dirty = self.interaction.dirty;
        self.interaction = Interaction::default();
        if was_dirty { self.record() } else { Ok(()) }
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        if self.crop.is_some() {
            self.cancel_crop();
        }
        let previous = self.history.index();
        match self.history.step_back() {
            Some(snapshot) => self.restore(snapshot, previous),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        if self.crop.is_some() {
            self.cancel_crop();
        }
        let previous = self.history.index();
        match self.history.step_forward() {
            Some(snapshot) => self.restore(snapshot, previous),
            None => false,
        }
    }

    fn restore(&mut self, snapshot: HistorySnapshot, previous_index: isize) -> bool {
        self.history.begin_restore();
        self.emit(EditorEvent::RestoreStarted);

        let restored = match snapshot.restore() {
            Ok(restored) => restored,
            Err(err) => {
                log::error!("Failed to restore snapshot: {}", err);
                self.history.revert_step(previous_index);
                self.emit(EditorEvent::RestoreFinished);
                self.history.end_restore();
                return false;
            }
        };
        let (document, sources) = restored;
        let resized = self
            .document
            .as_ref()
            .is_none_or(|d| d.width != document.width || d.height != document.height);
        let (width, height) = (document.width, document.height);
        let selection_lost = self.selection.is_some_and(|id| document.get(id).is_none());

        self.document = Some(document);
        self.sources = sources;
        self.interaction = Interaction::default();
        self.revision += 1;
        log::info!(
            "Restored snapshot {} of {}",
            self.history.index() + 1,
            self.history.len()
        );

        if selection_lost {
            self.selection = None;
            self.emit(EditorEvent::SelectionChanged(None));
        }
        if resized {
            self.emit(EditorEvent::CanvasResized { width, height });
        }
        self.emit(EditorEvent::ObjectsReordered);
        self.emit(EditorEvent::RestoreFinished);
        self.history.end_restore();
        self.emit_history();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> isize {
        self.history.index()
    }

    pub fn is_restoring(&self) -> bool {
        self.history.is_restoring()
    }

    // ---------------------------------------------------------------------
    // Selection and interactivity

    pub fn selected(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn selected_object(&self) -> Option<&Object> {
        let id = self.selection?;
        self.document.as_ref()?.get(id)
    }

    /// Select an object; `None` selects the background pseudo-layer
    pub fn select(&mut self, id: Option<ObjectId>) -> EditorResult<()> {
        if let Some(id) = id {
            let object = self.document_ref()?.get(id).ok_or(EditorError::ObjectNotFound(id))?;
            if object.is_background() {
                return Err(EditorError::BackgroundLayer);
            }
        }
        if self.selection != id {
            self.selection = id;
            self.emit(EditorEvent::SelectionChanged(id));
        }
        Ok(())
    }

    /// Topmost visible, unlocked object under `pos` (logical coordinates)
    pub fn hit_test(&self, pos: Pos2) -> Option<ObjectId> {
        if !self.interactive || self.crop.is_some() {
            return None;
        }
        self.document
            .as_ref()?
            .content_objects()
            .rev()
            .find(|o| o.visible && !o.locked && o.contains(pos))
            .map(|o| o.id)
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Interactivity to return to once the current crop ends
    pub fn base_interactive(&self) -> bool {
        match &self.crop {
            Some(session) => session.was_interactive,
            None => self.interactive,
        }
    }

    /// Allow or forbid picking objects on the canvas. While cropping, the
    /// value is remembered and applied when the crop ends.
    pub fn set_interactive(&mut self, interactive: bool) {
        if let Some(session) = &mut self.crop {
            session.was_interactive = interactive;
            return;
        }
        if self.interactive != interactive {
            self.interactive = interactive;
            self.emit(EditorEvent::InteractivityChanged(interactive));
        }
    }

    // ---------------------------------------------------------------------
    // Crop

    pub fn is_cropping(&self) -> bool {
        self.crop.is_some()
    }

    pub fn crop_rect(&self) -> Option<Rect> {
        self.crop.as_ref().map(CropSession::rect)
    }

    /// Show the crop rectangle and lock every object from interaction
    pub fn crop_image(&mut self) -> EditorResult<()> {
        if self.crop.is_some() {
            return Ok(());
        }
        let canvas = self.document_ref()?.rect();
        self.crop = Some(CropSession::new(canvas, self.interactive));
        log::info!("Crop started");
        self.emit(EditorEvent::CropStarted);
        if self.interactive {
            self.interactive = false;
            self.emit(EditorEvent::InteractivityChanged(false));
        }
        self.revision += 1;
        Ok(())
    }

    pub fn set_crop_rect(&mut self, rect: Rect) -> EditorResult<()> {
        let session = self.crop.as_mut().ok_or(EditorError::NotCropping)?;
        session.set_rect(rect);
        self.revision += 1;
        Ok(())
    }

    pub fn crop_handle_at(&self, pos: Pos2) -> Option<CropHandle> {
        self.crop.as_ref()?.handle_at(pos)
    }

    pub fn drag_crop(&mut self, handle: CropHandle, delta: Vec2) -> EditorResult<()> {
        let session = self.crop.as_mut().ok_or(EditorError::NotCropping)?;
        session.drag(handle, delta);
        self.revision += 1;
        Ok(())
    }

    /// Resize the canvas to the crop rectangle and shift every object by its origin
    pub fn apply_crop(&mut self) -> EditorResult<()> {
        let session = self.crop.as_ref().ok_or(EditorError::NotCropping)?;
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;
        let bounds = session.bounds(document.rect());
        if !bounds.is_positive() {
            log::warn!("Refusing crop of {}x{}", bounds.width(), bounds.height());
            return Err(EditorError::InvalidGeometry {
                width: bounds.width(),
                height: bounds.height(),
            });
        }
        let was_interactive = session.was_interactive;
        let document = self.document_mut()?;
        let offset = -bounds.min.to_vec2();
        for object in &mut document.objects {
            object.transform.translate(offset);
        }
        document.width = bounds.width() as u32;
        document.height = bounds.height() as u32;
        document.refit_background();
        let (width, height) = (document.width, document.height);

        self.crop = None;
        log::info!("Cropped to {}x{} at {:?}", width, height, bounds.min);
        self.emit(EditorEvent::CropFinished { applied: true });
        self.set_interactive(was_interactive);
        self.commit(EditorEvent::CanvasResized { width, height })
    }

    /// Drop the crop rectangle without touching the document or history
    pub fn cancel_crop(&mut self) -> bool {
        let Some(session) = self.crop.take() else {
            return false;
        };
        log::info!("Crop cancelled");
        self.revision += 1;
        self.emit(EditorEvent::CropFinished { applied: false });
        self.set_interactive(session.was_interactive);
        true
    }

    // ---------------------------------------------------------------------
    // Zoom and pan

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom
    }

    /// On-screen size of the canvas at the current zoom
    pub fn rendered_size(&self) -> Option<[u32; 2]> {
        let document = self.document.as_ref()?;
        Some(self.view.rendered_size(document.width, document.height))
    }

    fn view_changed(&self) {
        log::debug!("zoom {:.3}, pan {:?}", self.view.zoom, self.view.pan);
        self.emit(EditorEvent::ViewChanged {
            zoom: self.view.zoom,
            pan: self.view.pan,
        });
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
        self.view_changed();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
        self.view_changed();
    }

    pub fn set_zoom(&mut self, level: f32) {
        self.view.set_zoom(level);
        self.view_changed();
    }

    pub fn reset_zoom(&mut self) {
        self.view.reset();
        self.view_changed();
    }

    /// Largest zoom (at most 1) showing the whole canvas inside `container`
    pub fn fit_to_viewport(&mut self, container: Vec2) {
        let Some(document) = &self.document else {
            return;
        };
        let logical = egui::vec2(document.width as f32, document.height as f32);
        self.view.fit(logical, container, self.config.fit_margin);
        self.view_changed();
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.view.pan += delta;
        self.view_changed();
    }
}
