use egui::{Context, DroppedFile};

/// An image file dropped onto the window
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Collects image files dropped onto the window
#[derive(Debug, Default)]
pub struct FileHandler {
    rejected: Vec<String>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of dropped files that were not usable images
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Drain this frame's dropped files, keeping the readable images
    pub fn take_dropped_images(&mut self, ctx: &Context) -> Vec<DroppedImage> {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        dropped
            .iter()
            .filter_map(|file| {
                let name = file_name(file);
                if !is_image_file(file) {
                    log::warn!("Dropped file is not a supported type: {}", name);
                    self.rejected.push(name);
                    return None;
                }
                match read_bytes(file) {
                    Some(bytes) => {
                        log::info!("Dropped image {} ({} bytes)", name, bytes.len());
                        Some(DroppedImage { name, bytes })
                    }
                    None => {
                        log::error!("Could not read dropped file {}", name);
                        self.rejected.push(name);
                        None
                    }
                }
            })
            .collect()
    }
}

fn file_name(file: &DroppedFile) -> String {
    if let Some(path) = &file.path {
        path.display().to_string()
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

/// Image by MIME type, or by extension when the platform gives no MIME type
pub fn is_image_file(file: &DroppedFile) -> bool {
    if !file.mime.is_empty() {
        return file.mime.starts_with("image/");
    }
    let extension = file
        .path
        .as_ref()
        .and_then(|p| p.extension())
        .map(|e| e.to_string_lossy().to_lowercase())
        .or_else(|| file.name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()));
    matches!(
        extension.as_deref(),
        Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp")
    )
}

fn read_bytes(file: &DroppedFile) -> Option<Vec<u8>> {
    if let Some(bytes) = &file.bytes {
        return Some(bytes.to_vec());
    }
    #[cfg(not(target_arch = "wasm32"))]
    if let Some(path) = &file.path {
        return std::fs::read(path)
            .inspect_err(|e| log::error!("Failed to read {}: {}", path.display(), e))
            .ok();
    }
    None
}
