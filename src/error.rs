use thiserror::Error;

use crate::document::ObjectId;

/// Errors surfaced by the editing engine and its collaborators.
///
/// Every variant is recoverable: the document is left exactly as it was
/// before the failing call.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Background removal (or a remote image fetch) failed. The message is
    /// taken verbatim from the remote payload when one was returned.
    #[error("{0}")]
    Network(String),

    #[error("Invalid crop area: {width}x{height}")]
    InvalidGeometry { width: f32, height: f32 },

    #[error("No document is loaded")]
    NoDocument,

    #[error("Object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("Object {0} is locked")]
    ObjectLocked(ObjectId),

    #[error("Object {id} is not {expected}")]
    WrongKind { id: ObjectId, expected: &'static str },

    #[error("The background layer cannot be changed this way")]
    BackgroundLayer,

    #[error("No layer at row {0}")]
    NoSuchLayer(usize),

    #[error("No crop is in progress")]
    NotCropping,

    #[error("Object {0} changed while background removal was running")]
    TargetChanged(ObjectId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to serialize snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;

impl From<image::ImageError> for EditorError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Encoding(e) => EditorError::Encode(e.to_string()),
            other => EditorError::Decode(other.to_string()),
        }
    }
}
