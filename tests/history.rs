mod common;

use common::{blank_engine, engine_with_photo, record_events};
use egui::pos2;
use photo_canvas::config::EditorConfig;
use photo_canvas::engine::CanvasEngine;
use photo_canvas::event::EditorEvent;

#[test]
fn undoing_every_mutation_restores_the_original_graph() {
    let mut engine = engine_with_photo(640, 480);
    let original = engine.document().cloned().expect("document");

    let rect = engine.add_rect().expect("rect");
    engine.set_opacity(rect, 0.4).expect("opacity");
    engine.set_position(rect, pos2(12.0, 34.0)).expect("move");
    let circle = engine.add_circle().expect("circle");
    engine.set_angle(circle, 45.0).expect("rotate");
    engine.delete(rect).expect("delete");
    assert_eq!(engine.history_len(), 7);

    for _ in 0..6 {
        assert!(engine.undo());
    }
    assert_eq!(engine.document(), Some(&original));
    assert_eq!(engine.history_index(), 0);
}

#[test]
fn redo_replays_the_undone_mutation() {
    let mut engine = blank_engine(400, 300);
    let rect = engine.add_rect().expect("rect");
    engine.set_opacity(rect, 0.25).expect("opacity");
    let after = engine.document().cloned();

    assert!(engine.undo());
    assert_eq!(engine.document().and_then(|d| d.get(rect)).map(|o| o.opacity), Some(1.0));
    assert!(engine.redo());
    assert_eq!(engine.document().cloned(), after);
}

#[test]
fn undo_at_the_first_entry_is_a_no_op() {
    let mut engine = engine_with_photo(100, 80);
    let before = engine.document().cloned();

    assert!(!engine.can_undo());
    assert!(!engine.undo());
    assert_eq!(engine.history_index(), 0);
    assert_eq!(engine.document().cloned(), before);
}

#[test]
fn redo_at_the_last_entry_is_a_no_op() {
    let mut engine = blank_engine(100, 80);
    engine.add_rect().expect("rect");
    let before = engine.document().cloned();

    assert!(!engine.can_redo());
    assert!(!engine.redo());
    assert_eq!(engine.history_index(), 1);
    assert_eq!(engine.document().cloned(), before);
}

#[test]
fn a_new_mutation_discards_the_redo_branch() {
    let mut engine = blank_engine(200, 200);
    engine.add_rect().expect("rect");
    engine.add_circle().expect("circle");
    assert!(engine.undo());
    assert!(engine.can_redo());

    engine.add_triangle().expect("triangle");
    assert!(!engine.can_redo());
    assert_eq!(engine.history_len(), 3);
}

#[test]
fn history_keeps_only_the_newest_snapshots() {
    let config = EditorConfig {
        history_capacity: 3,
        ..EditorConfig::default()
    };
    let mut engine = CanvasEngine::new(config);
    engine
        .create_blank(200, 200, Default::default())
        .expect("blank");
    for _ in 0..5 {
        engine.add_rect().expect("rect");
    }
    assert_eq!(engine.history_len(), 3);
    assert_eq!(engine.history_index(), 2);

    assert!(engine.undo());
    assert!(engine.undo());
    assert!(!engine.undo());
    // Oldest retained state already holds three rectangles
    let rectangles = engine.document().map(|d| d.content_objects().count());
    assert_eq!(rectangles, Some(3));
}

#[test]
fn the_default_history_is_capped_at_twenty() {
    let mut engine = blank_engine(200, 200);
    for _ in 0..30 {
        engine.add_rect().expect("rect");
    }
    assert_eq!(engine.history_len(), 20);
}

#[test]
fn a_gesture_records_a_single_snapshot() {
    let mut engine = blank_engine(300, 300);
    let rect = engine.add_rect().expect("rect");
    let len = engine.history_len();

    engine.begin_interaction();
    for opacity in [0.8, 0.6, 0.4, 0.2] {
        engine.set_opacity(rect, opacity).expect("opacity");
    }
    assert_eq!(engine.history_len(), len);
    engine.commit_interaction().expect("commit");
    assert_eq!(engine.history_len(), len + 1);

    assert!(engine.undo());
    assert_eq!(engine.document().and_then(|d| d.get(rect)).map(|o| o.opacity), Some(1.0));
}

#[test]
fn an_empty_gesture_records_nothing() {
    let mut engine = blank_engine(300, 300);
    let len = engine.history_len();
    engine.begin_interaction();
    engine.commit_interaction().expect("commit");
    assert_eq!(engine.history_len(), len);
}

#[test]
fn edits_that_change_nothing_are_not_recorded() {
    let mut engine = blank_engine(300, 300);
    let rect = engine.add_rect().expect("rect");
    let len = engine.history_len();
    engine.set_opacity(rect, 1.0).expect("opacity");
    engine.set_visible(rect, true).expect("visible");
    assert_eq!(engine.history_len(), len);
}

#[test]
fn restore_is_bracketed_and_never_records_itself() {
    let mut engine = blank_engine(300, 300);
    engine.add_rect().expect("rect");
    let events = record_events(&engine);

    assert!(engine.undo());
    assert!(!engine.is_restoring());
    assert_eq!(engine.history_len(), 2);

    let events = events.borrow();
    let started = events
        .iter()
        .position(|e| *e == EditorEvent::RestoreStarted)
        .expect("restore started");
    let finished = events
        .iter()
        .position(|e| *e == EditorEvent::RestoreFinished)
        .expect("restore finished");
    assert!(started < finished);
    assert_eq!(
        events.last(),
        Some(&EditorEvent::HistoryChanged { index: 0, len: 2 })
    );
}

#[test]
fn undo_drops_a_selection_that_no_longer_exists() {
    let mut engine = blank_engine(300, 300);
    let rect = engine.add_rect().expect("rect");
    assert_eq!(engine.selected(), Some(rect));

    assert!(engine.undo());
    assert_eq!(engine.selected(), None);
}

#[test]
fn loading_a_new_document_resets_history() {
    let mut engine = blank_engine(300, 300);
    engine.add_rect().expect("rect");
    engine.add_rect().expect("rect");

    engine.create_blank(100, 100, Default::default()).expect("blank");
    assert_eq!(engine.history_len(), 1);
    assert!(!engine.can_undo());
}
