use base64::Engine as _;
use image::RgbaImage;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::document::SourceId;
use crate::error::{EditorError, EditorResult};
use crate::task::{self, TaskFuture};

/// Where an image comes from
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded image bytes (PNG, JPEG, ...)
    Bytes(Vec<u8>),
    /// `data:` URL with a base64 payload
    DataUrl(String),
    /// Remote URL; must be fetched before it can be decoded
    Remote(String),
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ImageSource::DataUrl(url) => write!(f, "DataUrl({} chars)", url.len()),
            ImageSource::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
        }
    }
}

impl ImageSource {
    /// Classify a URL string: `data:` URLs are embedded, everything else is remote
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        if url.starts_with("data:") {
            ImageSource::DataUrl(url)
        } else {
            ImageSource::Remote(url)
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Remote(_))
    }

    /// Decode embedded sources into RGBA pixels
    pub fn decode(&self) -> EditorResult<RgbaImage> {
        match self {
            ImageSource::Bytes(bytes) => decode_bytes(bytes),
            ImageSource::DataUrl(url) => decode_bytes(&data_url_payload(url)?),
            ImageSource::Remote(url) => Err(EditorError::Decode(format!(
                "remote image {} has not been fetched",
                url
            ))),
        }
    }

    /// Resolve the source to encoded bytes, fetching remote URLs
    pub fn fetch(self) -> TaskFuture<EditorResult<Vec<u8>>> {
        match self {
            ImageSource::Bytes(bytes) => task::boxed(async move { Ok(bytes) }),
            ImageSource::DataUrl(url) => task::boxed(async move { data_url_payload(&url) }),
            ImageSource::Remote(url) => fetch_remote(url),
        }
    }
}

pub(crate) fn decode_bytes(bytes: &[u8]) -> EditorResult<RgbaImage> {
    let image = image::load_from_memory(bytes).map_err(|e| EditorError::Decode(e.to_string()))?;
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(EditorError::Decode("image has no pixels".into()));
    }
    Ok(rgba)
}

fn data_url_payload(url: &str) -> EditorResult<Vec<u8>> {
    let Some((header, payload)) = url.split_once(',') else {
        return Err(EditorError::Decode("malformed data URL".into()));
    };
    if !header.ends_with(";base64") {
        return Err(EditorError::Decode("only base64 data URLs are supported".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| EditorError::Decode(e.to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_remote(url: String) -> TaskFuture<EditorResult<Vec<u8>>> {
    // Runs on whichever thread polls it; the shell polls on a worker thread.
    task::boxed(async move {
        log::info!("Fetching image {}", url);
        let response = reqwest::blocking::get(&url).map_err(|e| EditorError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EditorError::Network(format!("{} returned {}", url, status)));
        }
        let bytes = response.bytes().map_err(|e| EditorError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    })
}

#[cfg(target_arch = "wasm32")]
fn fetch_remote(url: String) -> TaskFuture<EditorResult<Vec<u8>>> {
    task::boxed(async move {
        log::info!("Fetching image {}", url);
        let response = reqwest::get(&url).await.map_err(|e| EditorError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EditorError::Network(format!("{} returned {}", url, status)));
        }
        let bytes = response.bytes().await.map_err(|e| EditorError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    })
}

/// Immutable pixel buffers referenced by image objects
#[derive(Clone, Default)]
pub struct SourceStore {
    sources: HashMap<SourceId, Arc<RgbaImage>>,
}

impl std::fmt::Debug for SourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStore")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl SourceStore {
    pub(crate) fn from_map(sources: HashMap<SourceId, Arc<RgbaImage>>) -> Self {
        Self { sources }
    }

    pub fn insert(&mut self, pixels: RgbaImage) -> SourceId {
        let id = SourceId::new();
        self.sources.insert(id, Arc::new(pixels));
        id
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<RgbaImage>> {
        self.sources.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Drop buffers no live object refers to; snapshots keep their own references
    pub fn retain_referenced(&mut self, referenced: &HashSet<SourceId>) {
        self.sources.retain(|id, _| referenced.contains(id));
    }
}
