#![allow(dead_code)]

use egui::Color32;
use image::{ImageFormat, Rgba, RgbaImage};
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use photo_canvas::document::Background;
use photo_canvas::engine::{CanvasEngine, ImageSource, SegmentationService};
use photo_canvas::error::{EditorError, EditorResult};
use photo_canvas::event::EditorEvent;
use photo_canvas::task::{self, TaskFuture};

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Cursor::new(Vec::new());
    pixels
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode test png");
    bytes.into_inner()
}

/// Engine holding an `width`×`height` photo
pub fn engine_with_photo(width: u32, height: u32) -> CanvasEngine {
    let mut engine = CanvasEngine::default();
    engine
        .load_image(ImageSource::Bytes(png_bytes(width, height, [200, 120, 40, 255])))
        .expect("load photo");
    engine
}

/// Engine holding an empty white canvas
pub fn blank_engine(width: u32, height: u32) -> CanvasEngine {
    let mut engine = CanvasEngine::default();
    engine
        .create_blank(width, height, Background::Solid(Color32::WHITE))
        .expect("create blank canvas");
    engine
}

/// Every event the engine emits, in order
pub fn record_events(engine: &CanvasEngine) -> Rc<RefCell<Vec<EditorEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(Box::new(move |event: &EditorEvent| sink.borrow_mut().push(event.clone())));
    events
}

/// Segmentation service answering every request with the same image
pub struct FixedSegmentation {
    pub result: Vec<u8>,
}

impl FixedSegmentation {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            result: png_bytes(width, height, [10, 200, 90, 128]),
        }
    }
}

impl SegmentationService for FixedSegmentation {
    fn segment(&self, _png: Vec<u8>) -> TaskFuture<EditorResult<Vec<u8>>> {
        let result = self.result.clone();
        task::boxed(async move { Ok(result) })
    }
}

/// Segmentation service that always fails with `message`
pub struct FailingSegmentation {
    pub message: String,
}

impl SegmentationService for FailingSegmentation {
    fn segment(&self, _png: Vec<u8>) -> TaskFuture<EditorResult<Vec<u8>>> {
        let message = self.message.clone();
        task::boxed(async move { Err(EditorError::Network(message)) })
    }
}
