mod common;

use common::{engine_with_photo, record_events};
use egui::{Rect, pos2, vec2};
use photo_canvas::engine::{CropHandle, ImageSource};
use photo_canvas::error::EditorError;
use photo_canvas::event::EditorEvent;
use photo_canvas::render::ExportFormat;

#[test]
fn applying_a_crop_resizes_the_canvas_and_shifts_objects() {
    let mut engine = engine_with_photo(800, 600);
    let rect = engine.add_rect().expect("rect");
    let photo = engine.base_image().expect("photo");
    let rect_before = engine.document().and_then(|d| d.get(rect)).map(|o| o.transform.position());
    let len = engine.history_len();

    engine.crop_image().expect("start crop");
    assert_eq!(engine.history_len(), len);
    engine
        .set_crop_rect(Rect::from_min_max(pos2(100.0, 100.0), pos2(500.0, 400.0)))
        .expect("crop rect");
    engine.apply_crop().expect("apply");

    let document = engine.document().expect("document");
    assert_eq!((document.width, document.height), (400, 300));
    assert_eq!(document.get(photo).map(|o| o.transform.position()), Some(pos2(-100.0, -100.0)));
    assert_eq!(
        document.get(rect).map(|o| o.transform.position()),
        rect_before.map(|p| p - vec2(100.0, 100.0))
    );
    assert_eq!(engine.history_len(), len + 1);
    assert!(!engine.is_cropping());
    assert!(engine.is_interactive());
}

#[test]
fn crop_can_be_undone() {
    let mut engine = engine_with_photo(800, 600);
    engine.crop_image().expect("start crop");
    engine
        .set_crop_rect(Rect::from_min_max(pos2(0.0, 0.0), pos2(200.0, 100.0)))
        .expect("crop rect");
    engine.apply_crop().expect("apply");
    assert_eq!(engine.document().map(|d| (d.width, d.height)), Some((200, 100)));

    assert!(engine.undo());
    assert_eq!(engine.document().map(|d| (d.width, d.height)), Some((800, 600)));
}

#[test]
fn cancelling_a_crop_changes_nothing() {
    let mut engine = engine_with_photo(800, 600);
    let before = engine.document().cloned();
    let len = engine.history_len();

    engine.crop_image().expect("start crop");
    assert!(!engine.is_interactive());
    engine
        .set_crop_rect(Rect::from_min_max(pos2(10.0, 10.0), pos2(50.0, 50.0)))
        .expect("crop rect");
    assert!(engine.cancel_crop());

    assert_eq!(engine.document().cloned(), before);
    assert_eq!(engine.history_len(), len);
    assert!(engine.is_interactive());
    assert!(!engine.cancel_crop());
}

#[test]
fn crop_starts_inset_from_the_canvas() {
    let mut engine = engine_with_photo(1000, 500);
    engine.crop_image().expect("start crop");
    assert_eq!(
        engine.crop_rect(),
        Some(Rect::from_min_max(pos2(100.0, 50.0), pos2(900.0, 450.0)))
    );
}

#[test]
fn an_empty_crop_is_refused() {
    let mut engine = engine_with_photo(800, 600);
    let len = engine.history_len();
    engine.crop_image().expect("start crop");
    engine
        .set_crop_rect(Rect::from_min_max(pos2(100.0, 100.0), pos2(100.0, 400.0)))
        .expect("crop rect");

    let err = engine.apply_crop().expect_err("zero width");
    assert!(matches!(err, EditorError::InvalidGeometry { .. }));
    assert_eq!(engine.document().map(|d| (d.width, d.height)), Some((800, 600)));
    assert_eq!(engine.history_len(), len);
    assert!(engine.is_cropping());
}

#[test]
fn crop_outside_the_canvas_is_clipped() {
    let mut engine = engine_with_photo(400, 300);
    engine.crop_image().expect("start crop");
    engine
        .set_crop_rect(Rect::from_min_max(pos2(-50.0, -50.0), pos2(200.0, 500.0)))
        .expect("crop rect");
    engine.apply_crop().expect("apply");
    assert_eq!(engine.document().map(|d| (d.width, d.height)), Some((200, 300)));
}

#[test]
fn dragging_a_corner_resizes_the_crop() {
    let mut engine = engine_with_photo(1000, 500);
    engine.crop_image().expect("start crop");
    let corner = pos2(900.0, 450.0);
    assert_eq!(engine.crop_handle_at(corner), Some(CropHandle::BottomRight));
    assert_eq!(engine.crop_handle_at(pos2(500.0, 250.0)), Some(CropHandle::Move));

    engine.drag_crop(CropHandle::BottomRight, vec2(-100.0, -50.0)).expect("drag");
    assert_eq!(
        engine.crop_rect(),
        Some(Rect::from_min_max(pos2(100.0, 50.0), pos2(800.0, 400.0)))
    );
}

#[test]
fn crop_operations_require_a_session() {
    let mut engine = engine_with_photo(100, 100);
    assert!(matches!(engine.apply_crop(), Err(EditorError::NotCropping)));
    assert!(matches!(
        engine.set_crop_rect(Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0))),
        Err(EditorError::NotCropping)
    ));
}

#[test]
fn crop_events_are_emitted() {
    let mut engine = engine_with_photo(300, 300);
    let events = record_events(&engine);
    engine.crop_image().expect("start crop");
    engine.cancel_crop();

    let events = events.borrow();
    assert!(events.contains(&EditorEvent::CropStarted));
    assert!(events.contains(&EditorEvent::CropFinished { applied: false }));
}

#[test]
fn zoom_steps_compound() {
    let mut engine = engine_with_photo(800, 600);
    for _ in 0..5 {
        engine.zoom_in();
    }
    assert!((engine.zoom() - 1.61051).abs() < 1e-4);
    let [width, height] = engine.rendered_size().expect("size");
    assert_eq!(width, (800.0 * engine.zoom()).round() as u32);
    assert_eq!(height, (600.0 * engine.zoom()).round() as u32);

    for _ in 0..5 {
        engine.zoom_out();
    }
    assert!((engine.zoom() - 1.0).abs() < 1e-4);
}

#[test]
fn zoom_is_clamped() {
    let mut engine = engine_with_photo(100, 100);
    engine.set_zoom(50.0);
    assert_eq!(engine.zoom(), engine.config().max_zoom);
    engine.set_zoom(0.0001);
    assert_eq!(engine.zoom(), engine.config().min_zoom);
}

#[test]
fn zoom_never_touches_geometry_or_history() {
    let mut engine = engine_with_photo(800, 600);
    let before = engine.document().cloned();
    let len = engine.history_len();
    engine.zoom_in();
    engine.zoom_in();
    assert_eq!(engine.document().cloned(), before);
    assert_eq!(engine.history_len(), len);
}

#[test]
fn fitting_keeps_the_canvas_inside_the_container() {
    let mut engine = engine_with_photo(800, 600);
    engine.zoom_in();
    engine.fit_to_viewport(vec2(1000.0, 500.0));

    assert!(engine.zoom() <= 1.0);
    let [width, height] = engine.rendered_size().expect("size");
    assert!(width as f32 <= 0.85 * 1000.0 + 1.0);
    assert!(height as f32 <= 0.85 * 500.0 + 1.0);
}

#[test]
fn fitting_never_enlarges_a_small_canvas() {
    let mut engine = engine_with_photo(200, 100);
    engine.fit_to_viewport(vec2(1920.0, 1080.0));
    assert_eq!(engine.zoom(), 1.0);
    assert_eq!(engine.rendered_size(), Some([200, 100]));
}

#[test]
fn export_is_at_logical_resolution() {
    let mut engine = engine_with_photo(320, 240);
    engine.zoom_in();
    engine.zoom_in();
    let png = engine.export_image(ExportFormat::Png).expect("export");

    let mut reloaded = photo_canvas::engine::CanvasEngine::default();
    reloaded.load_image(ImageSource::Bytes(png)).expect("reload");
    assert_eq!(reloaded.document().map(|d| (d.width, d.height)), Some((320, 240)));
}

#[test]
fn jpeg_export_decodes() {
    let engine = engine_with_photo(64, 48);
    let jpeg = engine.export_image(ExportFormat::Jpeg).expect("export");
    let decoded = image::load_from_memory(&jpeg).expect("decode jpeg");
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

#[test]
fn undo_and_redo_at_the_boundaries_keep_the_crop_open() {
    let mut engine = engine_with_photo(400, 300);
    engine.crop_image().expect("crop");

    assert!(!engine.undo());
    assert!(engine.is_cropping());
    assert!(!engine.redo());
    assert!(engine.is_cropping());
    assert!(!engine.is_interactive());
}
