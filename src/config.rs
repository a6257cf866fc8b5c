use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{EditorError, EditorResult};
use crate::render::ExportFormat;

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV_VAR: &str = "PHOTO_CANVAS_CONFIG";

/// Settings for the remote segmentation service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackgroundRemovalConfig {
    /// Endpoint that accepts a multipart image upload and answers with a PNG
    pub endpoint: String,
    /// Request timeout (native targets only)
    pub timeout_secs: u64,
    /// Multipart field name carrying the image
    pub field_name: String,
}

impl Default for BackgroundRemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/remove-background".to_owned(),
            timeout_secs: 60,
            field_name: "image_file".to_owned(),
        }
    }
}

/// Editor configuration, stored as JSON on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)] // missing fields fall back to their defaults
pub struct EditorConfig {
    /// Maximum number of history snapshots kept (oldest dropped first)
    pub history_capacity: usize,
    /// Factor applied by a single zoom in/out step
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Share of the viewport a fitted document may occupy
    pub fit_margin: f32,
    /// Offset applied to duplicated objects, in logical pixels
    pub duplicate_offset: f32,
    pub background_removal: BackgroundRemovalConfig,
    pub default_export_format: ExportFormat,
    pub jpeg_quality: u8,
    /// Font file used to rasterize text. The bundled egui fonts are used when unset.
    pub text_font: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            zoom_step: 1.1,
            min_zoom: 0.1,
            max_zoom: 5.0,
            fit_margin: 0.85,
            duplicate_offset: 10.0,
            background_removal: BackgroundRemovalConfig::default(),
            default_export_format: ExportFormat::Png,
            jpeg_quality: 92,
            text_font: None,
        }
    }
}

impl EditorConfig {
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("photo-canvas")
                .join("config.json")
        })
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(json) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("Ignoring config at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EditorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EditorResult<()> {
        if self.history_capacity == 0 {
            return Err(EditorError::Config("history_capacity must be at least 1".into()));
        }
        if self.min_zoom <= 0.0 || self.max_zoom < self.min_zoom {
            return Err(EditorError::Config(format!(
                "zoom range {}..{} is invalid",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 1.0 {
            return Err(EditorError::Config("zoom_step must be greater than 1".into()));
        }
        if self.fit_margin <= 0.0 || self.fit_margin > 1.0 {
            return Err(EditorError::Config("fit_margin must be in (0, 1]".into()));
        }
        Ok(())
    }
}
