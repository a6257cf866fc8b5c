mod common;

use common::{FailingSegmentation, FixedSegmentation, engine_with_photo, png_bytes};
use egui::Color32;
use photo_canvas::document::Background;
use photo_canvas::engine::{Alignment, CanvasEngine, ImageSource};
use photo_canvas::error::EditorError;
use photo_canvas::render::ExportFormat;
use photo_canvas::shell::{
    EditorShell, MemoryPersistence, PendingLoad, ShellMode, Status, ZOrder, builtin_templates,
    save_name_at,
};
use std::time::Duration;

fn wait_for_removal(shell: &mut EditorShell) -> Option<photo_canvas::error::EditorResult<photo_canvas::document::ObjectId>> {
    for _ in 0..500 {
        if let Some(result) = shell.poll_background_removal() {
            return Some(result);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    None
}

#[test]
fn the_shell_starts_in_the_gallery() {
    let shell = EditorShell::new();
    assert_eq!(shell.mode(), ShellMode::TemplateGallery);
    assert!(!shell.is_mounted());
    assert!(!shell.has_document());
}

#[test]
fn editing_requires_a_document() {
    let mut shell = EditorShell::new();
    shell.show(ShellMode::StockSearch);
    assert_eq!(shell.mode(), ShellMode::StockSearch);
    shell.show(ShellMode::Edit);
    assert_eq!(shell.mode(), ShellMode::StockSearch);
}

#[test]
fn a_template_chosen_before_mounting_is_replayed() {
    let mut shell = EditorShell::new();
    let template = builtin_templates().into_iter().next().expect("template");
    assert_eq!(template.name, "Product photo");

    shell.choose_template(template);
    assert_eq!(shell.mode(), ShellMode::Edit);
    assert!(matches!(shell.pending(), Some(PendingLoad::Template(_))));
    assert!(!shell.has_document());

    shell.mount(CanvasEngine::default());
    assert!(shell.pending().is_none());
    let document = shell.engine().and_then(|e| e.document()).expect("document");
    assert_eq!((document.width, document.height), (2000, 2000));
    assert!(document.background_object().is_some());
}

#[test]
fn a_blank_canvas_chosen_before_mounting_is_replayed() {
    let mut shell = EditorShell::new();
    shell.create_blank(300, 200, Background::Solid(Color32::RED));
    shell.mount(CanvasEngine::default());

    let document = shell.engine().and_then(|e| e.document()).expect("document");
    assert_eq!((document.width, document.height), (300, 200));
    assert_eq!(document.background, Background::Solid(Color32::RED));
}

#[test]
fn choosing_an_image_on_a_mounted_shell_loads_it_at_once() {
    let mut shell = EditorShell::with_engine(CanvasEngine::default());
    shell.choose_image(ImageSource::Bytes(png_bytes(64, 32, [1, 2, 3, 255])));

    assert!(shell.pending().is_none());
    assert_eq!(shell.mode(), ShellMode::Edit);
    let document = shell.engine().and_then(|e| e.document()).expect("document");
    assert_eq!((document.width, document.height), (64, 32));
}

#[test]
fn an_undecodable_first_image_returns_to_the_gallery() {
    let mut shell = EditorShell::with_engine(CanvasEngine::default());
    shell.choose_image(ImageSource::Bytes(b"definitely not a png".to_vec()));

    assert_eq!(shell.mode(), ShellMode::TemplateGallery);
    assert!(shell.status().is_some_and(Status::is_error));
    assert!(!shell.has_document());
}

#[test]
fn an_undecodable_replacement_keeps_the_current_document() {
    let mut shell = EditorShell::with_engine(engine_with_photo(120, 90));
    shell.choose_image(ImageSource::Bytes(Vec::new()));

    assert_eq!(shell.mode(), ShellMode::Edit);
    assert!(shell.status().is_some_and(Status::is_error));
    let document = shell.engine().and_then(|e| e.document()).expect("document");
    assert_eq!((document.width, document.height), (120, 90));
}

#[test]
fn an_invalid_blank_size_is_reported() {
    let mut shell = EditorShell::with_engine(CanvasEngine::default());
    shell.create_blank(0, 100, Background::default());
    assert_eq!(shell.mode(), ShellMode::TemplateGallery);
    assert!(shell.status().is_some_and(Status::is_error));
}

#[test]
fn save_names_carry_the_timestamp_and_extension() {
    assert_eq!(save_name_at(ExportFormat::Jpeg, 1_700_000_000), "edited-image-1700000000.jpg");
    assert_eq!(save_name_at(ExportFormat::Png, 42), "edited-image-42.png");
}

#[test]
fn saving_hands_the_export_to_the_collaborator() {
    let mut shell = EditorShell::with_engine(engine_with_photo(80, 60));
    let saves = MemoryPersistence::new();

    let name = shell.save(&saves).expect("save");
    assert!(name.starts_with("edited-image-"));
    assert!(name.ends_with(".png"));
    let digits = &name["edited-image-".len()..name.len() - ".png".len()];
    assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));

    let saved = saves.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, name);
    assert_eq!(saved[0].mime_type, "image/png");
    let decoded = image::load_from_memory(&saved[0].bytes).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (80, 60));
    assert!(matches!(shell.status(), Some(Status::Info(_))));
}

#[test]
fn saving_honours_the_export_format() {
    let mut shell = EditorShell::with_engine(engine_with_photo(40, 40));
    shell.set_export_format(ExportFormat::Jpeg);
    let saves = MemoryPersistence::new();

    let name = shell.save(&saves).expect("save");
    assert!(name.ends_with(".jpg"));
    assert_eq!(saves.saved()[0].mime_type, "image/jpeg");
}

#[test]
fn saving_without_a_document_fails() {
    let mut shell = EditorShell::new();
    let saves = MemoryPersistence::new();
    assert!(matches!(shell.save(&saves), Err(EditorError::NoDocument)));
    assert!(saves.is_empty());
}

#[test]
fn download_writes_the_export() {
    let mut shell = EditorShell::with_engine(engine_with_photo(30, 20));
    let path = std::env::temp_dir().join(format!("photo-canvas-download-{}.png", std::process::id()));
    shell.download(&path).expect("download");

    let bytes = std::fs::read(&path).expect("read back");
    let decoded = image::load_from_memory(&bytes).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (30, 20));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn the_zoom_readout_is_a_rounded_percentage() {
    let mut shell = EditorShell::with_engine(engine_with_photo(800, 600));
    assert_eq!(shell.zoom_label(), "100%");
    for _ in 0..5 {
        shell.engine_mut().expect("engine").zoom_in();
    }
    assert_eq!(shell.zoom_label(), "161%");
}

#[test]
fn history_buttons_delegate_to_the_engine() {
    let mut engine = engine_with_photo(200, 200);
    engine.add_rect().expect("rect");
    let mut shell = EditorShell::with_engine(engine);

    assert!(shell.undo());
    assert!(!shell.undo());
    assert!(shell.redo());
    assert!(!shell.redo());
}

#[test]
fn arrangement_needs_a_selection() {
    let mut engine = engine_with_photo(400, 400);
    engine.add_rect().expect("rect");
    engine.select(None).expect("deselect");
    let mut shell = EditorShell::with_engine(engine);

    assert!(matches!(shell.align(Alignment::Left), Err(EditorError::BackgroundLayer)));
    assert!(matches!(shell.z_order(ZOrder::Front), Err(EditorError::BackgroundLayer)));
}

#[test]
fn arrangement_applies_to_the_selection() {
    let mut engine = engine_with_photo(400, 400);
    let rect = engine.add_rect().expect("rect");
    let mut shell = EditorShell::with_engine(engine);

    shell.z_order(ZOrder::Back).expect("back");
    assert_eq!(shell.engine().and_then(|e| e.z_index(rect)), Some(0));
    shell.align(Alignment::Top).expect("top");
    let top = shell
        .engine()
        .and_then(|e| e.document())
        .and_then(|d| d.get(rect))
        .map(|o| o.bounding_rect().top());
    assert_eq!(top, Some(0.0));
}

#[test]
fn background_removal_is_polled_to_completion() {
    let mut shell = EditorShell::with_engine(engine_with_photo(100, 80));
    let service = FixedSegmentation::sized(50, 40);

    shell.start_background_removal(&service).expect("start");
    assert!(shell.is_removing_background());
    assert!(matches!(shell.status(), Some(Status::Busy(_))));
    // A second request while one is in flight is ignored
    shell.start_background_removal(&service).expect("ignored");

    let result = wait_for_removal(&mut shell).expect("finished");
    let id = result.expect("removal");
    assert!(!shell.is_removing_background());
    assert_eq!(shell.status().map(Status::text), Some("Background removed"));

    let object = shell
        .engine()
        .and_then(|e| e.document())
        .and_then(|d| d.get(id))
        .expect("object");
    assert_eq!(object.displayed_size(), egui::vec2(100.0, 80.0));
}

#[test]
fn a_failed_removal_surfaces_the_message() {
    let mut shell = EditorShell::with_engine(engine_with_photo(100, 80));
    let before = shell.engine().and_then(|e| e.document()).cloned();
    let service = FailingSegmentation {
        message: "Service unavailable".to_owned(),
    };

    shell.start_background_removal(&service).expect("start");
    let result = wait_for_removal(&mut shell).expect("finished");
    assert!(result.is_err());
    assert_eq!(
        shell.status(),
        Some(&Status::Error("Service unavailable".to_owned()))
    );
    assert_eq!(shell.engine().and_then(|e| e.document()).cloned(), before);
}

#[test]
fn removal_without_a_document_fails() {
    let mut shell = EditorShell::new();
    let service = FixedSegmentation::sized(10, 10);
    assert!(matches!(
        shell.start_background_removal(&service),
        Err(EditorError::NoDocument)
    ));
}

#[test]
fn mounting_adopts_the_configured_export_format() {
    let config = photo_canvas::config::EditorConfig {
        default_export_format: ExportFormat::WebP,
        ..Default::default()
    };
    let shell = EditorShell::with_engine(CanvasEngine::new(config));
    assert_eq!(shell.export_format(), ExportFormat::WebP);
}
