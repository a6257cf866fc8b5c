mod common;

use common::{blank_engine, engine_with_photo, png_bytes, record_events};
use egui::{Color32, pos2, vec2};
use photo_canvas::document::{ImageProvenance, ObjectKind, ObjectRole, Paint, ShapeStyle};
use photo_canvas::engine::{Alignment, FilterAdjustment};
use photo_canvas::error::EditorError;
use photo_canvas::event::EditorEvent;

#[test]
fn shapes_are_centered_with_default_sizes() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    let circle = engine.add_circle().expect("circle");
    let document = engine.document().expect("document");

    let rect = document.get(rect).expect("rect object");
    assert_eq!(rect.name, "Rectangle");
    assert_eq!(rect.transform.position(), pos2(300.0, 225.0));
    assert_eq!(rect.displayed_size(), vec2(200.0, 150.0));

    let circle = document.get(circle).expect("circle object");
    assert_eq!(circle.name, "Circle");
    assert!(matches!(circle.kind, ObjectKind::Circle { radius, .. } if radius == 75.0));
    assert_eq!(circle.center(), pos2(400.0, 300.0));
}

#[test]
fn new_objects_are_selected_and_recorded_once() {
    let mut engine = blank_engine(400, 300);
    let events = record_events(&engine);
    let len = engine.history_len();

    let id = engine.add_triangle().expect("triangle");
    assert_eq!(engine.selected(), Some(id));
    assert_eq!(engine.history_len(), len + 1);
    let events = events.borrow();
    assert!(events.contains(&EditorEvent::ObjectAdded(id)));
    assert!(events.contains(&EditorEvent::SelectionChanged(Some(id))));
}

#[test]
fn blank_canvases_carry_a_locked_background() {
    let engine = blank_engine(640, 480);
    let document = engine.document().expect("document");
    let background = document.background_object().expect("background");
    assert_eq!(document.objects.len(), 1);
    assert_eq!(background.role, ObjectRole::Background);
    assert!(background.locked);
    assert_eq!(background.displayed_size(), vec2(640.0, 480.0));
    assert_eq!(document.first_content_index(), 1);
}

#[test]
fn loaded_photos_have_no_background_object() {
    let engine = engine_with_photo(320, 200);
    let document = engine.document().expect("document");
    assert!(document.background_object().is_none());
    assert_eq!(document.objects.len(), 1);
    assert_eq!(document.background, photo_canvas::document::Background::Solid(Color32::TRANSPARENT));
    assert!(matches!(
        &document.objects[0].kind,
        ObjectKind::Image(image) if image.provenance == ImageProvenance::Loaded
    ));
}

#[test]
fn the_background_object_refuses_edits() {
    let mut engine = blank_engine(300, 300);
    let background = engine
        .document()
        .and_then(|d| d.background_object())
        .map(|o| o.id)
        .expect("background");

    assert!(matches!(engine.select(Some(background)), Err(EditorError::BackgroundLayer)));
    assert!(matches!(engine.delete(background), Err(EditorError::BackgroundLayer)));
    assert!(matches!(engine.set_opacity(background, 0.5), Err(EditorError::BackgroundLayer)));
    assert!(matches!(engine.duplicate(background), Err(EditorError::BackgroundLayer)));
}

#[test]
fn duplicate_sits_above_the_original_and_is_offset() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    engine.add_circle().expect("circle");

    let copy = engine.duplicate(rect).expect("duplicate");
    assert_ne!(copy, rect);
    assert_eq!(engine.selected(), Some(copy));
    assert_eq!(engine.z_index(copy), engine.z_index(rect).map(|z| z + 1));

    let document = engine.document().expect("document");
    let original = document.get(rect).expect("original");
    let duplicate = document.get(copy).expect("copy");
    assert_eq!(duplicate.name, "Rectangle copy");
    assert_eq!(
        duplicate.transform.position(),
        original.transform.position() + vec2(10.0, 10.0)
    );
    assert_eq!(duplicate.kind, original.kind);
}

#[test]
fn duplicating_an_image_keeps_its_filters() {
    let mut engine = engine_with_photo(200, 200);
    let photo = engine.base_image().expect("photo");
    engine.apply_filter(photo, FilterAdjustment::Sepia(true)).expect("sepia");

    let copy = engine.duplicate(photo).expect("duplicate");
    let document = engine.document().expect("document");
    match &document.get(copy).expect("copy").kind {
        ObjectKind::Image(image) => assert!(image.filters.sepia),
        other => panic!("expected an image, got {:?}", other),
    }
}

#[test]
fn deleting_the_selection_clears_it() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    engine.delete(rect).expect("delete");

    assert_eq!(engine.selected(), None);
    assert!(engine.document().and_then(|d| d.get(rect)).is_none());
    assert!(matches!(engine.delete(rect), Err(EditorError::ObjectNotFound(_))));
}

#[test]
fn rotation_pivots_about_the_center() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    let center = engine.document().and_then(|d| d.get(rect)).map(|o| o.center()).expect("center");

    engine.set_angle(rect, 90.0).expect("rotate");
    let object = engine.document().and_then(|d| d.get(rect)).expect("rect");
    assert_eq!(object.transform.angle, 90.0);
    assert!((object.center() - center).length() < 1e-3);

    engine.rotate(rect, 300.0).expect("rotate more");
    let object = engine.document().and_then(|d| d.get(rect)).expect("rect");
    assert!((object.transform.angle - 30.0).abs() < 1e-3);
}

#[test]
fn locked_objects_cannot_be_moved() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    engine.set_locked(rect, true).expect("lock");
    let before = engine.document().cloned();

    assert!(matches!(engine.translate(rect, vec2(5.0, 5.0)), Err(EditorError::ObjectLocked(_))));
    assert!(matches!(engine.set_position(rect, pos2(0.0, 0.0)), Err(EditorError::ObjectLocked(_))));
    assert!(matches!(engine.align(rect, Alignment::Left), Err(EditorError::ObjectLocked(_))));
    assert_eq!(engine.document().cloned(), before);
    assert_eq!(engine.hit_test(pos2(200.0, 200.0)), None);
}

#[test]
fn scale_below_the_minimum_is_refused() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    engine.set_scale(rect, 2.0, 0.5).expect("scale");
    assert_eq!(
        engine.document().and_then(|d| d.get(rect)).map(|o| o.displayed_size()),
        Some(vec2(400.0, 75.0))
    );

    let err = engine.set_scale(rect, 0.0, 1.0).expect_err("zero scale");
    assert!(matches!(err, EditorError::InvalidGeometry { .. }));
    assert_eq!(
        engine.document().and_then(|d| d.get(rect)).map(|o| o.transform.scale()),
        Some(vec2(2.0, 0.5))
    );
}

#[test]
fn alignment_snaps_to_canvas_edges() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");

    engine.align(rect, Alignment::Left).expect("left");
    engine.align(rect, Alignment::Bottom).expect("bottom");
    let bounds = engine.document().and_then(|d| d.get(rect)).map(|o| o.bounding_rect()).expect("bounds");
    assert!(bounds.left().abs() < 1e-3);
    assert!((bounds.bottom() - 600.0).abs() < 1e-3);
}

#[test]
fn z_order_stays_above_the_background() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    let circle = engine.add_circle().expect("circle");

    engine.send_to_back(circle).expect("back");
    assert_eq!(engine.z_index(circle), Some(1));
    assert_eq!(engine.z_index(rect), Some(2));

    engine.send_backward(circle).expect("backward");
    assert_eq!(engine.z_index(circle), Some(1));

    engine.bring_to_front(circle).expect("front");
    assert_eq!(engine.z_index(circle), Some(2));
}

#[test]
fn hit_testing_finds_the_topmost_object() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    let circle = engine.add_circle().expect("circle");

    assert_eq!(engine.hit_test(pos2(400.0, 300.0)), Some(circle));
    // Inside the rectangle but outside the circle's bounds
    assert_eq!(engine.hit_test(pos2(310.0, 235.0)), Some(rect));
    assert_eq!(engine.hit_test(pos2(10.0, 10.0)), None);

    engine.set_visible(circle, false).expect("hide");
    assert_eq!(engine.hit_test(pos2(400.0, 300.0)), Some(rect));
}

#[test]
fn filters_apply_only_to_images() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    let err = engine
        .apply_filter(rect, FilterAdjustment::Brightness(0.2))
        .expect_err("not an image");
    assert!(matches!(err, EditorError::WrongKind { .. }));
}

#[test]
fn toggling_a_filter_twice_records_once() {
    let mut engine = engine_with_photo(100, 100);
    let photo = engine.base_image().expect("photo");
    let len = engine.history_len();

    engine.apply_filter(photo, FilterAdjustment::Grayscale(true)).expect("grayscale");
    engine.apply_filter(photo, FilterAdjustment::Grayscale(true)).expect("grayscale again");
    assert_eq!(engine.history_len(), len + 1);
}

#[test]
fn filter_values_are_clamped() {
    let mut engine = engine_with_photo(100, 100);
    let photo = engine.base_image().expect("photo");
    engine.apply_filter(photo, FilterAdjustment::Contrast(4.0)).expect("contrast");
    engine.apply_filter(photo, FilterAdjustment::Blur(-1.0)).expect("blur");

    match &engine.document().and_then(|d| d.get(photo)).expect("photo").kind {
        ObjectKind::Image(image) => {
            assert_eq!(image.filters.contrast, 1.0);
            assert_eq!(image.filters.blur, 0.0);
        }
        other => panic!("expected an image, got {:?}", other),
    }
}

#[test]
fn grayscale_renders_neutral_pixels() {
    let mut engine = engine_with_photo(16, 16);
    let photo = engine.base_image().expect("photo");
    engine.apply_filter(photo, FilterAdjustment::Grayscale(true)).expect("grayscale");

    let pixels = engine.render().expect("render");
    let [r, g, b, _] = pixels.get_pixel(8, 8).0;
    assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
}

#[test]
fn inserted_images_are_scaled_to_fit() {
    let mut engine = blank_engine(400, 300);
    let id = engine
        .add_image_bytes(&png_bytes(1000, 1000, [0, 0, 0, 255]), None)
        .expect("insert");
    let object = engine.document().and_then(|d| d.get(id)).expect("image");

    assert_eq!(object.name, "Image");
    let size = object.displayed_size();
    assert!(size.x <= 400.0 * 0.8 + 0.5 && size.y <= 300.0 * 0.8 + 0.5);
    assert!(matches!(
        &object.kind,
        ObjectKind::Image(image) if image.provenance == ImageProvenance::Inserted
    ));
}

#[test]
fn undecodable_bytes_are_rejected() {
    let mut engine = blank_engine(100, 100);
    let len = engine.history_len();
    let err = engine.add_image_bytes(b"not an image", None).expect_err("garbage");
    assert!(matches!(err, EditorError::Decode(_)));
    assert_eq!(engine.history_len(), len);
}

#[test]
fn shape_style_can_be_replaced() {
    let mut engine = blank_engine(400, 400);
    let rect = engine.add_rect().expect("rect");
    let style = ShapeStyle {
        fill: Some(Paint::Solid(Color32::RED)),
        stroke: Some(Color32::BLACK),
        stroke_width: -3.0,
    };
    engine.set_shape_style(rect, style).expect("style");

    let object = engine.document().and_then(|d| d.get(rect)).expect("rect");
    let stored = object.kind.shape_style().expect("shape style");
    assert_eq!(stored.fill, Some(Paint::Solid(Color32::RED)));
    assert_eq!(stored.stroke_width, 0.0);
}

#[test]
fn text_content_is_replaced() {
    let mut engine = blank_engine(600, 400);
    let text = engine.add_text("Hello", None).expect("text");
    engine.set_text_content(text, "Sale\n50% off").expect("content");

    match &engine.document().and_then(|d| d.get(text)).expect("text").kind {
        ObjectKind::Text(object) => {
            assert_eq!(object.content, "Sale\n50% off");
            assert_eq!(object.lines.len(), 2);
        }
        other => panic!("expected text, got {:?}", other),
    }

    let rect = engine.add_rect().expect("rect");
    assert!(matches!(
        engine.set_text_content(rect, "nope"),
        Err(EditorError::WrongKind { .. })
    ));
}

#[test]
fn operations_without_a_document_fail() {
    let mut engine = photo_canvas::engine::CanvasEngine::default();
    assert!(matches!(engine.add_rect(), Err(EditorError::NoDocument)));
    assert!(matches!(engine.crop_image(), Err(EditorError::NoDocument)));
    assert!(engine.render().is_none());
    assert!(!engine.undo());
}
