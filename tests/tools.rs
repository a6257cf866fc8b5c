mod common;

use common::{blank_engine, engine_with_photo};
use egui::{Color32, CursorIcon, pos2, vec2};
use photo_canvas::document::ObjectKind;
use photo_canvas::error::EditorError;
use photo_canvas::tool::{BrushSettings, PLACEHOLDER_TEXT, Pointer, ToolController, ToolKind};

#[test]
fn leaving_the_crop_tool_cancels_the_crop() {
    let mut engine = engine_with_photo(800, 600);
    let mut tools = ToolController::new();
    let len = engine.history_len();

    tools.set_tool(ToolKind::Crop, &mut engine).expect("crop");
    assert!(engine.is_cropping());
    assert!(!engine.is_interactive());

    tools.set_tool(ToolKind::Select, &mut engine).expect("select");
    assert!(!engine.is_cropping());
    assert!(engine.is_interactive());
    assert_eq!(engine.document().map(|d| (d.width, d.height)), Some((800, 600)));
    assert_eq!(engine.history_len(), len);
}

#[test]
fn switching_tools_never_records_history() {
    let mut engine = engine_with_photo(400, 300);
    let mut tools = ToolController::new();
    let len = engine.history_len();
    for tool in [ToolKind::Pan, ToolKind::Transform, ToolKind::Crop, ToolKind::Draw, ToolKind::Filter, ToolKind::Select] {
        tools.set_tool(tool, &mut engine).expect("switch");
        assert_eq!(tools.active(), tool);
    }
    assert_eq!(engine.history_len(), len);
}

#[test]
fn the_crop_tool_drags_corners() {
    let mut engine = engine_with_photo(1000, 500);
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Crop, &mut engine).expect("crop");

    tools.pointer_down(Pointer::at(pos2(900.0, 450.0)), &mut engine).expect("down");
    tools.pointer_move(Pointer::at(pos2(850.0, 420.0)), &mut engine).expect("move");
    tools.pointer_up(Pointer::at(pos2(800.0, 400.0)), &mut engine).expect("up");

    let rect = engine.crop_rect().expect("crop rect");
    assert_eq!(rect.max, pos2(800.0, 400.0));
    assert_eq!(rect.min, pos2(100.0, 50.0));
}

#[test]
fn panning_disables_picking_and_restores_it() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();

    tools.set_tool(ToolKind::Pan, &mut engine).expect("pan");
    assert!(!engine.is_interactive());
    assert!(tools.is_panning());
    assert_eq!(tools.cursor(), CursorIcon::Grab);

    tools.set_tool(ToolKind::Select, &mut engine).expect("select");
    assert!(engine.is_interactive());
    assert!(!tools.is_panning());
}

#[test]
fn the_pan_modifier_is_transient() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();

    tools.set_pan_modifier(true, &mut engine);
    assert!(tools.is_panning());
    assert!(!engine.is_interactive());
    assert_eq!(tools.active(), ToolKind::Select);

    tools.set_pan_modifier(false, &mut engine);
    assert!(!tools.is_panning());
    assert!(engine.is_interactive());
}

#[test]
fn pan_drags_move_the_view_only() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    let before = engine.document().cloned();
    let len = engine.history_len();
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Pan, &mut engine).expect("pan");

    tools.pointer_down(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("down");
    assert_eq!(tools.cursor(), CursorIcon::Grabbing);
    tools.pointer_move(Pointer::at(pos2(420.0, 330.0)), &mut engine).expect("move");
    tools.pointer_up(Pointer::at(pos2(430.0, 340.0)), &mut engine).expect("up");

    assert_eq!(engine.view().pan, vec2(30.0, 40.0));
    assert_eq!(engine.document().cloned(), before);
    assert_eq!(engine.history_len(), len);
    assert_eq!(engine.selected(), Some(rect));
}

#[test]
fn a_drag_moves_the_object_in_one_step() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    engine.select(None).expect("deselect");
    let len = engine.history_len();
    let mut tools = ToolController::new();

    tools.pointer_down(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("down");
    assert_eq!(engine.selected(), Some(rect));
    for step in 1..=4 {
        let offset = 5.0 * step as f32;
        tools
            .pointer_move(Pointer::at(pos2(400.0 + offset, 300.0 + offset)), &mut engine)
            .expect("move");
    }
    assert_eq!(tools.cursor(), CursorIcon::Move);
    tools.pointer_up(Pointer::at(pos2(420.0, 320.0)), &mut engine).expect("up");

    let position = engine.document().and_then(|d| d.get(rect)).map(|o| o.transform.position());
    assert_eq!(position, Some(pos2(320.0, 245.0)));
    assert_eq!(engine.history_len(), len + 1);

    assert!(engine.undo());
    let position = engine.document().and_then(|d| d.get(rect)).map(|o| o.transform.position());
    assert_eq!(position, Some(pos2(300.0, 225.0)));
}

#[test]
fn a_click_without_movement_records_nothing() {
    let mut engine = blank_engine(800, 600);
    engine.add_rect().expect("rect");
    let len = engine.history_len();
    let mut tools = ToolController::new();

    tools.pointer_down(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("down");
    tools.pointer_up(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("up");
    assert_eq!(engine.history_len(), len);
}

#[test]
fn clicking_empty_canvas_selects_the_background() {
    let mut engine = blank_engine(800, 600);
    engine.add_rect().expect("rect");
    let mut tools = ToolController::new();

    tools.pointer_down(Pointer::at(pos2(5.0, 5.0)), &mut engine).expect("down");
    tools.pointer_up(Pointer::at(pos2(5.0, 5.0)), &mut engine).expect("up");
    assert_eq!(engine.selected(), None);
}

#[test]
fn drawing_adds_a_stroke() {
    let mut engine = blank_engine(400, 400);
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Draw, &mut engine).expect("draw");
    tools.set_brush(BrushSettings {
        color: Color32::RED,
        width: 8.0,
        eraser: false,
    });
    let len = engine.history_len();

    tools.pointer_down(Pointer::at(pos2(10.0, 10.0)), &mut engine).expect("down");
    tools.pointer_move(Pointer::at(pos2(50.0, 60.0)), &mut engine).expect("move");
    assert_eq!(tools.stroke_preview().map(<[_]>::len), Some(2));
    tools.pointer_move(Pointer::at(pos2(90.0, 20.0)), &mut engine).expect("move");
    tools.pointer_up(Pointer::at(pos2(100.0, 30.0)), &mut engine).expect("up");

    assert!(tools.stroke_preview().is_none());
    assert_eq!(engine.history_len(), len + 1);
    let stroke = engine.selected_object().expect("stroke");
    assert_eq!(stroke.name, "Line");
    assert_eq!(stroke.transform.position(), pos2(10.0, 10.0));
    match &stroke.kind {
        ObjectKind::Line { points, style, .. } => {
            assert_eq!(points.len(), 4);
            assert_eq!(style.stroke, Some(Color32::RED));
            assert_eq!(style.stroke_width, 8.0);
        }
        other => panic!("expected a line, got {:?}", other),
    }
}

#[test]
fn eraser_strokes_are_named_as_such() {
    let mut engine = blank_engine(400, 400);
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Draw, &mut engine).expect("draw");
    tools.set_brush(BrushSettings {
        eraser: true,
        ..BrushSettings::default()
    });

    tools.pointer_down(Pointer::at(pos2(10.0, 10.0)), &mut engine).expect("down");
    tools.pointer_up(Pointer::at(pos2(60.0, 10.0)), &mut engine).expect("up");
    assert_eq!(engine.selected_object().map(|o| o.name.as_str()), Some("Eraser"));
}

#[test]
fn the_text_tool_adds_placeholder_text() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();
    let len = engine.history_len();

    tools.set_tool(ToolKind::Text, &mut engine).expect("text");
    let id = tools.editing_text().expect("editing");
    assert_eq!(engine.selected(), Some(id));
    assert_eq!(engine.history_len(), len + 1);
    match &engine.selected_object().expect("text").kind {
        ObjectKind::Text(text) => assert_eq!(text.content, PLACEHOLDER_TEXT),
        other => panic!("expected text, got {:?}", other),
    }

    tools.commit_text("Summer sale", &mut engine).expect("commit");
    match &engine.selected_object().expect("text").kind {
        ObjectKind::Text(text) => assert_eq!(text.content, "Summer sale"),
        other => panic!("expected text, got {:?}", other),
    }

    tools.set_tool(ToolKind::Select, &mut engine).expect("select");
    assert_eq!(tools.editing_text(), None);
}

#[test]
fn reselecting_the_text_tool_while_editing_adds_nothing() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Text, &mut engine).expect("text");
    let count = engine.document().map(|d| d.objects.len());

    tools.set_tool(ToolKind::Text, &mut engine).expect("text again");
    assert_eq!(engine.document().map(|d| d.objects.len()), count);
}

#[test]
fn committing_without_an_edit_target_is_a_no_op() {
    let mut engine = blank_engine(400, 400);
    let mut tools = ToolController::new();
    let before = engine.document().cloned();
    tools.commit_text("ignored", &mut engine).expect("commit");
    tools.finish_text_editing();
    assert_eq!(engine.document().cloned(), before);
}

#[test]
fn canvas_coordinates_drive_hit_testing() {
    let mut engine = blank_engine(800, 600);
    let rect = engine.add_rect().expect("rect");
    engine.select(None).expect("deselect");
    let mut tools = ToolController::new();

    // Pointer far away on screen, but over the rectangle on the canvas
    let pointer = Pointer::new(pos2(1200.0, 900.0), pos2(350.0, 250.0));
    tools.pointer_down(pointer, &mut engine).expect("down");
    assert_eq!(engine.selected(), Some(rect));
    tools.pointer_up(pointer, &mut engine).expect("up");
}

#[test]
fn panning_during_a_crop_keeps_picking_for_after_the_crop() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();
    let rect = engine.add_rect().expect("rect");
    engine.select(None).expect("deselect");

    tools.set_tool(ToolKind::Crop, &mut engine).expect("crop");
    tools.set_pan_modifier(true, &mut engine);
    tools.set_pan_modifier(false, &mut engine);
    assert!(!engine.is_interactive());

    tools.set_tool(ToolKind::Select, &mut engine).expect("select");
    assert!(engine.is_interactive());
    tools.pointer_down(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("down");
    tools.pointer_up(Pointer::at(pos2(400.0, 300.0)), &mut engine).expect("up");
    assert_eq!(engine.selected(), Some(rect));
}

#[test]
fn starting_a_crop_while_the_pan_modifier_is_held() {
    let mut engine = blank_engine(800, 600);
    let mut tools = ToolController::new();

    tools.set_pan_modifier(true, &mut engine);
    tools.set_tool(ToolKind::Crop, &mut engine).expect("crop");
    tools.set_pan_modifier(false, &mut engine);
    assert!(!engine.is_interactive());

    tools.set_tool(ToolKind::Select, &mut engine).expect("select");
    assert!(engine.is_interactive());
}

#[test]
fn tools_needing_a_document_are_refused_without_switching() {
    let mut engine = photo_canvas::engine::CanvasEngine::default();
    let mut tools = ToolController::new();

    for tool in [ToolKind::Crop, ToolKind::Text] {
        assert!(matches!(tools.set_tool(tool, &mut engine), Err(EditorError::NoDocument)));
        assert_eq!(tools.active(), ToolKind::Select);
        assert!(!engine.is_cropping());
        assert_eq!(tools.editing_text(), None);
    }
}

#[test]
fn a_refused_tool_leaves_panning_in_place() {
    let mut engine = photo_canvas::engine::CanvasEngine::default();
    let mut tools = ToolController::new();
    tools.set_tool(ToolKind::Pan, &mut engine).expect("pan");

    assert!(tools.set_tool(ToolKind::Crop, &mut engine).is_err());
    assert_eq!(tools.active(), ToolKind::Pan);
    assert!(tools.is_panning());
    assert!(!engine.is_interactive());
}
