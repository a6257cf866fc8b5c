#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod components;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod event;
pub mod file_handler;
pub mod panels;
pub mod render;
pub mod shell;
pub mod task;
pub mod texture_manager;
pub mod tool;
pub mod util;

pub use app::PhotoCanvasApp;
pub use config::EditorConfig;
pub use document::{Document, Object, ObjectId, ObjectKind};
pub use engine::{CanvasEngine, ImageSource, LayerTarget, SegmentationService};
pub use error::{EditorError, EditorResult};
pub use event::{EditorEvent, EventHandler};
pub use render::ExportFormat;
pub use shell::{EditorShell, ShellMode};
pub use tool::{ToolController, ToolKind};
