use egui::Ui;

use crate::components::ToolButton;
use crate::shell::EditorShell;
use crate::tool::ToolKind;

/// Left column: tool picker, shape inserts and history state
pub fn tools_panel(ui: &mut Ui, shell: &mut EditorShell) {
    ui.heading("Tools");

    let Some((engine, tools)) = shell.parts_mut() else {
        ui.label("No document");
        return;
    };

    let active = tools.active();
    let mut picked = None;
    ui.horizontal_wrapped(|ui| {
        for tool in ToolKind::ALL {
            if ToolButton::new(tool, tool == active).show(ui).clicked() {
                picked = Some(tool);
            }
        }
    });
    if let Some(tool) = picked {
        log::info!("Tool selected from UI: {}", tool.label());
        if let Err(err) = tools.set_tool(tool, engine) {
            log::warn!("Could not switch to {}: {}", tool.label(), err);
        }
    }

    if active == ToolKind::Crop && engine.is_cropping() {
        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Apply crop").clicked() {
                if let Err(err) = engine.apply_crop() {
                    log::warn!("{}", err);
                }
            }
            if ui.button("Cancel").clicked() {
                engine.cancel_crop();
            }
        });
    }

    ui.separator();
    ui.label("Insert");
    ui.horizontal_wrapped(|ui| {
        let inserted = if ui.button("▭ Rectangle").clicked() {
            Some(engine.add_rect())
        } else if ui.button("○ Circle").clicked() {
            Some(engine.add_circle())
        } else if ui.button("△ Triangle").clicked() {
            Some(engine.add_triangle())
        } else {
            None
        };
        if let Some(Err(err)) = inserted {
            log::warn!("Insert failed: {}", err);
        }
    });

    ui.separator();
    ui.horizontal(|ui| {
        if ui.add_enabled(engine.can_undo(), egui::Button::new("Undo")).clicked() {
            engine.undo();
        }
        if ui.add_enabled(engine.can_redo(), egui::Button::new("Redo")).clicked() {
            engine.redo();
        }
    });
    ui.label(format!(
        "History: {} of {}",
        engine.history_index() + 1,
        engine.history_len()
    ));
}
