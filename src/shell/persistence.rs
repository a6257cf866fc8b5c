use std::cell::RefCell;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

use crate::error::EditorResult;
use crate::render::ExportFormat;
use crate::util::time;

/// Receives exported images. Where and how they are stored is up to the implementor.
pub trait PersistenceCollaborator {
    fn persist(&self, name: &str, mime_type: &str, bytes: &[u8]) -> EditorResult<()>;
}

/// Name handed to the collaborator with every save
pub fn save_name(format: ExportFormat) -> String {
    save_name_at(format, time::unix_secs())
}

pub fn save_name_at(format: ExportFormat, unix_secs: u64) -> String {
    format!("edited-image-{}.{}", unix_secs, format.extension())
}

/// Writes saved images into a directory
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct DirectoryPersistence {
    dir: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirectoryPersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PersistenceCollaborator for DirectoryPersistence {
    fn persist(&self, name: &str, _mime_type: &str, bytes: &[u8]) -> EditorResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Keeps saved images in memory (web builds and tests)
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: RefCell<Vec<SavedImage>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<SavedImage> {
        self.saved.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.saved.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.borrow().is_empty()
    }
}

impl PersistenceCollaborator for MemoryPersistence {
    fn persist(&self, name: &str, mime_type: &str, bytes: &[u8]) -> EditorResult<()> {
        self.saved.borrow_mut().push(SavedImage {
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}
