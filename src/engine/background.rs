use egui::{Pos2, Vec2};

use super::CanvasEngine;
use super::source::decode_bytes;
use crate::config::BackgroundRemovalConfig;
use crate::document::{
    ImageFilters, ImageObject, ImageProvenance, ObjectId, ObjectKind, apply_matrix, factory,
};
use crate::error::{EditorError, EditorResult};
use crate::event::EditorEvent;
use crate::render::{self, ExportFormat};
use crate::task::{self, BackgroundTask, TaskFuture};

/// External service that cuts the subject out of an image.
///
/// Takes a PNG and answers with a raster that has an alpha channel.
pub trait SegmentationService {
    fn segment(&self, png: Vec<u8>) -> TaskFuture<EditorResult<Vec<u8>>>;
}

/// What a background removal applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerTarget {
    Object(ObjectId),
    /// The background pseudo-layer: the base image, or the whole canvas
    Background,
}

/// Bookkeeping for a request in flight
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRemovalJob {
    pub(crate) target: JobTarget,
    /// Displayed size of the target when the request was sent
    pub displayed: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum JobTarget {
    Object(ObjectId),
    /// Result becomes a new full-canvas image object
    Canvas,
}

impl BackgroundRemovalJob {
    pub fn object(&self) -> Option<ObjectId> {
        match self.target {
            JobTarget::Object(id) => Some(id),
            JobTarget::Canvas => None,
        }
    }
}

impl CanvasEngine {
    /// Rasterize the target to PNG. Nothing changes until the result is
    /// handed to [`Self::finish_background_removal`].
    pub fn begin_background_removal(&self, target: LayerTarget) -> EditorResult<(BackgroundRemovalJob, Vec<u8>)> {
        let document = self.document_ref()?;
        let object = match target {
            LayerTarget::Object(id) => {
                let object = document.get(id).ok_or(EditorError::ObjectNotFound(id))?;
                if object.is_background() { self.base_image() } else { Some(id) }
            }
            LayerTarget::Background => self.base_image(),
        };

        let (job, pixels) = match object {
            Some(id) => {
                let displayed = document
                    .get(id)
                    .map(|o| o.displayed_size())
                    .ok_or(EditorError::ObjectNotFound(id))?;
                let job = BackgroundRemovalJob {
                    target: JobTarget::Object(id),
                    displayed,
                };
                (job, self.render_object(id)?)
            }
            None => {
                let job = BackgroundRemovalJob {
                    target: JobTarget::Canvas,
                    displayed: document.rect().size(),
                };
                (job, self.render().ok_or(EditorError::NoDocument)?)
            }
        };
        let png = render::encode(&pixels, ExportFormat::Png, self.config.jpeg_quality)?;
        log::info!(
            "Background removal dispatched for {:?} ({}x{})",
            job.target,
            pixels.width(),
            pixels.height()
        );
        Ok((job, png))
    }

    /// Apply the service's answer. On any error the document is left as it was.
    ///
    /// The new pixels are rescaled so the displayed size stays the same:
    /// `scale = displayed / natural` on each axis.
    pub fn finish_background_removal(
        &mut self,
        job: &BackgroundRemovalJob,
        result: EditorResult<Vec<u8>>,
    ) -> EditorResult<ObjectId> {
        let png = result.inspect_err(|e| log::warn!("Background removal failed: {}", e))?;
        let pixels = decode_bytes(&png).inspect_err(|e| log::warn!("Background removal returned {}", e))?;
        let (width, height) = pixels.dimensions();

        match job.target {
            JobTarget::Object(id) => {
                let object = self
                    .document_ref()?
                    .get(id)
                    .ok_or(EditorError::TargetChanged(id))?;
                let bounds = object.local_bounds();
                let matrix = object.matrix();
                let old_scale = object.transform.scale();
                let displayed = object.displayed_size();
                let original = match &object.kind {
                    ObjectKind::Image(image) => ImageProvenance::BackgroundRemoved {
                        original: image.source,
                    },
                    _ => ImageProvenance::Inserted,
                };

                let source = self.sources.insert(pixels);
                let document = self.document_mut()?;
                let Some(object) = document.get_mut(id) else {
                    return Err(EditorError::TargetChanged(id));
                };
                // The new local origin sits where the old bounds started
                let origin: Pos2 = apply_matrix(&matrix, bounds.min);
                object.transform.left = origin.x;
                object.transform.top = origin.y;
                object.transform.scale_x = old_scale.x.signum() * displayed.x / width as f32;
                object.transform.scale_y = old_scale.y.signum() * displayed.y / height as f32;
                object.kind = ObjectKind::Image(ImageObject {
                    source,
                    natural_width: width,
                    natural_height: height,
                    filters: ImageFilters::default(),
                    provenance: original,
                });
                log::info!("Background removed from {} ({}x{} result)", id, width, height);
                self.commit(EditorEvent::ObjectModified(id))?;
                Ok(id)
            }
            JobTarget::Canvas => {
                let canvas = self.document_ref()?.rect();
                let source = self.sources.insert(pixels);
                let mut object = factory::image(source, width, height, Pos2::ZERO, ImageProvenance::Inserted);
                object.transform.scale_x = canvas.width() / width as f32;
                object.transform.scale_y = canvas.height() / height as f32;
                let id = object.id;
                let document = self.document_mut()?;
                let index = document.first_content_index();
                document.objects.insert(index, object);
                log::info!("Background removed from canvas ({}x{} result)", width, height);
                self.commit(EditorEvent::ObjectAdded(id))?;
                Ok(id)
            }
        }
    }

    /// Dispatch, await and apply in one go
    pub async fn remove_background(
        &mut self,
        target: LayerTarget,
        service: &dyn SegmentationService,
    ) -> EditorResult<ObjectId> {
        let (job, png) = self.begin_background_removal(target)?;
        let result = service.segment(png).await;
        self.finish_background_removal(&job, result)
    }
}

/// A dispatched request polled once per frame
pub struct PendingRemoval {
    job: BackgroundRemovalJob,
    task: BackgroundTask<EditorResult<Vec<u8>>>,
}

impl std::fmt::Debug for PendingRemoval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRemoval").field("job", &self.job).finish()
    }
}

impl PendingRemoval {
    /// Rasterize the target and send it to `service` in the background
    pub fn dispatch(
        engine: &CanvasEngine,
        target: LayerTarget,
        service: &dyn SegmentationService,
    ) -> EditorResult<Self> {
        let (job, png) = engine.begin_background_removal(target)?;
        let task = BackgroundTask::spawn(service.segment(png));
        Ok(Self { job, task })
    }

    pub fn job(&self) -> &BackgroundRemovalJob {
        &self.job
    }

    /// Apply the result once it has arrived. `None` while still waiting.
    pub fn poll(&self, engine: &mut CanvasEngine) -> Option<EditorResult<ObjectId>> {
        let result = self.task.poll()?;
        Some(engine.finish_background_removal(&self.job, result))
    }
}

/// Segmentation over HTTP: a multipart POST of the PNG
#[derive(Debug, Clone)]
pub struct HttpSegmentationService {
    config: BackgroundRemovalConfig,
}

impl HttpSegmentationService {
    pub fn new(config: BackgroundRemovalConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl SegmentationService for HttpSegmentationService {
    #[cfg(not(target_arch = "wasm32"))]
    fn segment(&self, png: Vec<u8>) -> TaskFuture<EditorResult<Vec<u8>>> {
        use reqwest::blocking::{Client, multipart};

        let config = self.config.clone();
        task::boxed(async move {
            log::info!("Sending {} bytes to {}", png.len(), config.endpoint);
            let part = multipart::Part::bytes(png)
                .file_name("image.png")
                .mime_str("image/png")
                .map_err(|e| EditorError::Network(e.to_string()))?;
            let form = multipart::Form::new().part(config.field_name.clone(), part);
            let client = Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| EditorError::Network(e.to_string()))?;
            let response = client
                .post(&config.endpoint)
                .multipart(form)
                .send()
                .map_err(|e| EditorError::Network(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(EditorError::Network(error_message(status, &body)));
            }
            let bytes = response.bytes().map_err(|e| EditorError::Network(e.to_string()))?;
            Ok(bytes.to_vec())
        })
    }

    #[cfg(target_arch = "wasm32")]
    fn segment(&self, png: Vec<u8>) -> TaskFuture<EditorResult<Vec<u8>>> {
        use reqwest::multipart;

        let config = self.config.clone();
        task::boxed(async move {
            log::info!("Sending {} bytes to {}", png.len(), config.endpoint);
            let part = multipart::Part::bytes(png)
                .file_name("image.png")
                .mime_str("image/png")
                .map_err(|e| EditorError::Network(e.to_string()))?;
            let form = multipart::Form::new().part(config.field_name.clone(), part);
            let response = reqwest::Client::new()
                .post(&config.endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(|e| EditorError::Network(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EditorError::Network(error_message(status, &body)));
            }
            let bytes = response.bytes().await.map_err(|e| EditorError::Network(e.to_string()))?;
            Ok(bytes.to_vec())
        })
    }
}

/// Message of a failed response: the payload's `error` or `message` field, else the status text
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_payload = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|value| {
        ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_owned))
    });
    from_payload.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_owned)
            .unwrap_or_else(|| status.to_string())
    })
}
