//! Top-level editor flow: choosing how a document starts, then the global
//! actions that sit above the canvas (save, download, history buttons,
//! arrangement shortcuts, the zoom readout and background removal).

mod persistence;

#[cfg(not(target_arch = "wasm32"))]
pub use persistence::DirectoryPersistence;
pub use persistence::{MemoryPersistence, PersistenceCollaborator, SavedImage, save_name, save_name_at};

use egui::{Color32, Vec2};

use crate::document::{Background, GradientDirection, ObjectId, TemplateSpec};
use crate::engine::{Alignment, CanvasEngine, ImageSource, LayerTarget, PendingRemoval, SegmentationService};
use crate::error::{EditorError, EditorResult};
use crate::render::ExportFormat;
use crate::task::BackgroundTask;
use crate::tool::ToolController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellMode {
    #[default]
    TemplateGallery,
    StockSearch,
    BlankCanvasSetup,
    Edit,
}

/// One-step z-order shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Forward,
    Backward,
    Front,
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Busy(String),
    Info(String),
    Error(String),
}

impl Status {
    pub fn text(&self) -> &str {
        match self {
            Status::Busy(text) | Status::Info(text) | Status::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }
}

/// How the document should start, held until an engine is mounted
#[derive(Debug, Clone, PartialEq)]
pub enum PendingLoad {
    Image(ImageSource),
    Template(TemplateSpec),
    Blank {
        width: u32,
        height: u32,
        background: Background,
    },
}

/// Templates offered by the gallery
pub fn builtin_templates() -> Vec<TemplateSpec> {
    vec![
        TemplateSpec {
            name: "Product photo".to_owned(),
            width: 2000,
            height: 2000,
            background: Background::Solid(Color32::WHITE),
        },
        TemplateSpec {
            name: "Square post".to_owned(),
            width: 1080,
            height: 1080,
            background: Background::Solid(Color32::from_rgb(0xf3, 0xf4, 0xf6)),
        },
        TemplateSpec {
            name: "Story".to_owned(),
            width: 1080,
            height: 1920,
            background: Background::Gradient {
                from: Color32::from_rgb(0xfd, 0xe6, 0x8a),
                to: Color32::from_rgb(0xf9, 0x73, 0x16),
                direction: GradientDirection::Vertical,
            },
        },
        TemplateSpec {
            name: "Banner".to_owned(),
            width: 1200,
            height: 628,
            background: Background::Gradient {
                from: Color32::from_rgb(0x1e, 0x3a, 0x8a),
                to: Color32::from_rgb(0x3b, 0x82, 0xf6),
                direction: GradientDirection::Horizontal,
            },
        },
    ]
}

#[derive(Debug, Default)]
pub struct EditorShell {
    mode: ShellMode,
    engine: Option<CanvasEngine>,
    tools: ToolController,
    pending: Option<PendingLoad>,
    /// Remote image being fetched for a pending load
    fetch: Option<BackgroundTask<EditorResult<Vec<u8>>>>,
    removal: Option<PendingRemoval>,
    status: Option<Status>,
    export_format: ExportFormat,
}

impl EditorShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shell with an engine already in place
    pub fn with_engine(engine: CanvasEngine) -> Self {
        let mut shell = Self::new();
        shell.mount(engine);
        shell
    }

    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    /// Navigate between the pre-document screens
    pub fn show(&mut self, mode: ShellMode) {
        if mode != ShellMode::Edit || self.has_document() {
            self.mode = mode;
        }
    }

    pub fn engine(&self) -> Option<&CanvasEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut CanvasEngine> {
        self.engine.as_mut()
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.is_some()
    }

    pub fn has_document(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.has_document())
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    /// Engine and tool controller together, for routing pointer input
    pub fn parts_mut(&mut self) -> Option<(&mut CanvasEngine, &mut ToolController)> {
        let engine = self.engine.as_mut()?;
        Some((engine, &mut self.tools))
    }

    pub fn pending(&self) -> Option<&PendingLoad> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.export_format = format;
    }

    /// Install the engine and replay whatever was chosen before it existed
    pub fn mount(&mut self, engine: CanvasEngine) {
        self.export_format = engine.config().default_export_format;
        self.engine = Some(engine);
        self.tick();
    }

    // ---------------------------------------------------------------------
    // Document entry points

    pub fn choose_template(&mut self, template: TemplateSpec) {
        self.defer(PendingLoad::Template(template));
    }

    pub fn choose_stock_image(&mut self, url: impl Into<String>) {
        self.defer(PendingLoad::Image(ImageSource::from_url(url)));
    }

    pub fn choose_image(&mut self, source: ImageSource) {
        self.defer(PendingLoad::Image(source));
    }

    pub fn create_blank(&mut self, width: u32, height: u32, background: Background) {
        self.defer(PendingLoad::Blank {
            width,
            height,
            background,
        });
    }

    fn defer(&mut self, load: PendingLoad) {
        self.mode = ShellMode::Edit;
        self.fetch = None;
        self.pending = Some(load);
        self.tick();
    }

    /// Per-frame housekeeping: replay a deferred load once the engine is
    /// mounted, and collect finished background work.
    pub fn tick(&mut self) {
        self.poll_fetch();
        self.replay_pending();
        self.poll_background_removal();
    }

    fn poll_fetch(&mut self) {
        let Some(result) = self.fetch.as_ref().and_then(|task| task.poll()) else {
            return;
        };
        self.fetch = None;
        match result {
            Ok(bytes) => self.pending = Some(PendingLoad::Image(ImageSource::Bytes(bytes))),
            Err(err) => self.fail(err),
        }
    }

    fn replay_pending(&mut self) {
        if self.fetch.is_some() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            if self.pending.is_some() {
                log::debug!("Engine not mounted yet; deferring load");
            }
            return;
        };
        let Some(load) = self.pending.take() else {
            return;
        };
        let result = match load {
            PendingLoad::Image(source) if source.is_remote() => {
                self.fetch = Some(BackgroundTask::spawn(source.fetch()));
                self.status = Some(Status::Busy("Loading image…".to_owned()));
                return;
            }
            PendingLoad::Image(source) => engine.load_image(source),
            PendingLoad::Template(template) => engine.load_template(&template),
            PendingLoad::Blank {
                width,
                height,
                background,
            } => engine.create_blank(width, height, background),
        };
        match result {
            Ok(()) => {
                if matches!(self.status, Some(Status::Busy(_))) {
                    self.status = None;
                }
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: EditorError) {
        log::error!("Could not create document: {}", err);
        self.status = Some(Status::Error(err.to_string()));
        if !self.has_document() {
            self.mode = ShellMode::TemplateGallery;
        }
    }

    fn engine_checked(&mut self) -> EditorResult<&mut CanvasEngine> {
        self.engine.as_mut().ok_or(EditorError::NoDocument)
    }

    // ---------------------------------------------------------------------
    // Global actions

    /// Export the document and hand it to `collaborator`. Returns the generated name.
    pub fn save(&mut self, collaborator: &dyn PersistenceCollaborator) -> EditorResult<String> {
        let format = self.export_format;
        let bytes = self.engine_checked()?.export_image(format)?;
        let name = save_name(format);
        collaborator.persist(&name, format.mime_type(), &bytes)?;
        self.status = Some(Status::Info(format!("Saved {}", name)));
        Ok(name)
    }

    /// Write the export to `path`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn download(&mut self, path: &std::path::Path) -> EditorResult<()> {
        let format = self.export_format;
        let bytes = self.engine_checked()?.export_image(format)?;
        std::fs::write(path, &bytes)?;
        log::info!("Downloaded {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        self.engine.as_mut().is_some_and(|e| e.undo())
    }

    pub fn redo(&mut self) -> bool {
        self.engine.as_mut().is_some_and(|e| e.redo())
    }

    fn selected(&mut self) -> EditorResult<(&mut CanvasEngine, ObjectId)> {
        let engine = self.engine_checked()?;
        let id = engine.selected().ok_or(EditorError::BackgroundLayer)?;
        Ok((engine, id))
    }

    /// Align the selected object
    pub fn align(&mut self, alignment: Alignment) -> EditorResult<()> {
        let (engine, id) = self.selected()?;
        engine.align(id, alignment)
    }

    pub fn z_order(&mut self, order: ZOrder) -> EditorResult<()> {
        let (engine, id) = self.selected()?;
        match order {
            ZOrder::Forward => engine.bring_forward(id),
            ZOrder::Backward => engine.send_backward(id),
            ZOrder::Front => engine.bring_to_front(id),
            ZOrder::Back => engine.send_to_back(id),
        }
    }

    /// Live zoom readout, e.g. `161%`
    pub fn zoom_label(&self) -> String {
        let percent = self.engine.as_ref().map_or(100, |e| e.view().percent());
        format!("{}%", percent)
    }

    pub fn fit_to_viewport(&mut self, container: Vec2) {
        if let Some(engine) = self.engine.as_mut() {
            engine.fit_to_viewport(container);
        }
    }

    // ---------------------------------------------------------------------
    // Background removal

    pub fn is_removing_background(&self) -> bool {
        self.removal.is_some()
    }

    /// Send the selection (or the background) to `service`. Ignored while a
    /// request is already in flight.
    pub fn start_background_removal(&mut self, service: &dyn SegmentationService) -> EditorResult<()> {
        if self.removal.is_some() {
            return Ok(());
        }
        let engine = self.engine.as_ref().ok_or(EditorError::NoDocument)?;
        let target = match engine.selected() {
            Some(id) => LayerTarget::Object(id),
            None => LayerTarget::Background,
        };
        match PendingRemoval::dispatch(engine, target, service) {
            Ok(pending) => {
                self.removal = Some(pending);
                self.status = Some(Status::Busy("Removing background…".to_owned()));
                Ok(())
            }
            Err(err) => {
                self.status = Some(Status::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Apply a finished background removal. `None` while nothing has completed.
    pub fn poll_background_removal(&mut self) -> Option<EditorResult<ObjectId>> {
        let engine = self.engine.as_mut()?;
        let result = self.removal.as_ref()?.poll(engine)?;
        self.removal = None;
        self.status = Some(match &result {
            Ok(_) => Status::Info("Background removed".to_owned()),
            Err(err) => Status::Error(err.to_string()),
        });
        Some(result)
    }
}
