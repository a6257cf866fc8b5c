use egui::{Color32, Key, Pos2, Rect, Sense, Shape, Stroke, pos2, vec2};

use crate::config::EditorConfig;
use crate::document::{Background, ObjectId, ObjectKind};
use crate::engine::{Alignment, CanvasEngine, HttpSegmentationService, ImageSource, ViewState};
use crate::file_handler::FileHandler;
use crate::panels::{LayerPanel, PropertiesPanel, layers_panel, properties_panel, tools_panel};
use crate::render::ExportFormat;
use crate::shell::{EditorShell, ShellMode, Status, ZOrder, builtin_templates};
#[cfg(not(target_arch = "wasm32"))]
use crate::shell::DirectoryPersistence;
#[cfg(target_arch = "wasm32")]
use crate::shell::MemoryPersistence;
use crate::texture_manager::TextureManager;
use crate::tool::Pointer;

const ACCENT: Color32 = Color32::from_rgb(33, 150, 243);

/// Form values kept between sessions
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct AppSettings {
    blank_width: u32,
    blank_height: u32,
    blank_color: Color32,
    stock_url: String,
    export_format: ExportFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            blank_width: 1080,
            blank_height: 1080,
            blank_color: Color32::WHITE,
            stock_url: String::new(),
            export_format: ExportFormat::Png,
        }
    }
}

pub struct PhotoCanvasApp {
    config: EditorConfig,
    settings: AppSettings,
    shell: EditorShell,
    properties: Option<PropertiesPanel>,
    layers: Option<LayerPanel>,
    texture: TextureManager,
    files: FileHandler,
    segmentation: HttpSegmentationService,
    #[cfg(not(target_arch = "wasm32"))]
    saves: DirectoryPersistence,
    #[cfg(target_arch = "wasm32")]
    saves: MemoryPersistence,
    /// Canvas size last fitted into the viewport; a new size is fitted again
    fitted_size: Option<(u32, u32)>,
    text_buffer: String,
    text_target: Option<ObjectId>,
}

impl Default for PhotoCanvasApp {
    fn default() -> Self {
        Self::with_config(EditorConfig::default(), AppSettings::default())
    }
}

impl PhotoCanvasApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: AppSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_config(EditorConfig::load(), settings)
    }

    fn with_config(config: EditorConfig, settings: AppSettings) -> Self {
        let mut shell = EditorShell::new();
        shell.set_export_format(settings.export_format);
        Self {
            segmentation: HttpSegmentationService::new(config.background_removal.clone()),
            #[cfg(not(target_arch = "wasm32"))]
            saves: DirectoryPersistence::new("saved"),
            #[cfg(target_arch = "wasm32")]
            saves: MemoryPersistence::new(),
            config,
            settings,
            shell,
            properties: None,
            layers: None,
            texture: TextureManager::new(),
            files: FileHandler::new(),
            fitted_size: None,
            text_buffer: String::new(),
            text_target: None,
        }
    }

    /// The engine is mounted once the UI is running; anything chosen before
    /// that waits in the shell.
    fn ensure_mounted(&mut self) {
        if self.shell.is_mounted() {
            return;
        }
        let engine = CanvasEngine::new(self.config.clone());
        self.properties = Some(PropertiesPanel::attach(&engine));
        self.layers = Some(LayerPanel::attach(&engine));
        let format = self.settings.export_format;
        self.shell.mount(engine);
        self.shell.set_export_format(format);
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let typing = ctx.wants_keyboard_input();
        let (undo, redo, delete, escape, enter, space) = ctx.input(|i| {
            let command = i.modifiers.command;
            (
                command && !i.modifiers.shift && i.key_pressed(Key::Z),
                command && (i.key_pressed(Key::Y) || (i.modifiers.shift && i.key_pressed(Key::Z))),
                i.key_pressed(Key::Delete) || i.key_pressed(Key::Backspace),
                i.key_pressed(Key::Escape),
                i.key_pressed(Key::Enter),
                i.key_down(Key::Space),
            )
        });
        let Some((engine, tools)) = self.shell.parts_mut() else {
            return;
        };
        if typing {
            return;
        }
        tools.set_pan_modifier(space, engine);
        if undo {
            engine.undo();
        }
        if redo {
            engine.redo();
        }
        if escape {
            engine.cancel_crop();
            tools.finish_text_editing();
        }
        if enter && engine.is_cropping() {
            if let Err(err) = engine.apply_crop() {
                log::warn!("{}", err);
            }
        }
        if delete {
            if let Some(id) = engine.selected() {
                if let Err(err) = engine.delete(id) {
                    log::warn!("{}", err);
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        for image in self.files.take_dropped_images(ctx) {
            match self.shell.engine_mut() {
                Some(engine) if engine.has_document() => {
                    if let Err(err) = engine.add_image_bytes(&image.bytes, None) {
                        log::error!("Could not insert {}: {}", image.name, err);
                    }
                }
                _ => self.shell.choose_image(ImageSource::Bytes(image.bytes)),
            }
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("New").clicked() {
                    self.shell.show(ShellMode::TemplateGallery);
                }
                if self.shell.mode() != ShellMode::Edit {
                    return;
                }
                ui.separator();

                let (can_undo, can_redo) = self
                    .shell
                    .engine()
                    .map_or((false, false), |e| (e.can_undo(), e.can_redo()));
                if ui.add_enabled(can_undo, egui::Button::new("⟲ Undo")).clicked() {
                    self.shell.undo();
                }
                if ui.add_enabled(can_redo, egui::Button::new("⟳ Redo")).clicked() {
                    self.shell.redo();
                }
                ui.separator();

                if let Some(engine) = self.shell.engine_mut() {
                    if ui.button("−").clicked() {
                        engine.zoom_out();
                    }
                }
                ui.label(self.shell.zoom_label());
                if let Some(engine) = self.shell.engine_mut() {
                    if ui.button("+").clicked() {
                        engine.zoom_in();
                    }
                    if ui.button("100%").clicked() {
                        engine.reset_zoom();
                    }
                }
                if ui.button("Fit").clicked() {
                    self.fitted_size = None;
                }
                ui.separator();

                ui.menu_button("Arrange", |ui| {
                    for alignment in Alignment::ALL {
                        if ui.button(alignment.label()).clicked() {
                            report(self.shell.align(alignment));
                            ui.close_menu();
                        }
                    }
                    ui.separator();
                    for (order, label) in [
                        (ZOrder::Front, "Bring to front"),
                        (ZOrder::Forward, "Bring forward"),
                        (ZOrder::Backward, "Send backward"),
                        (ZOrder::Back, "Send to back"),
                    ] {
                        if ui.button(label).clicked() {
                            report(self.shell.z_order(order));
                            ui.close_menu();
                        }
                    }
                });
                ui.separator();

                let removing = self.shell.is_removing_background();
                if ui
                    .add_enabled(!removing, egui::Button::new("Remove background"))
                    .clicked()
                {
                    report(self.shell.start_background_removal(&self.segmentation));
                }
                ui.separator();

                let mut format = self.shell.export_format();
                egui::ComboBox::from_id_salt("export_format")
                    .selected_text(format.label())
                    .show_ui(ui, |ui| {
                        for option in ExportFormat::ALL {
                            ui.selectable_value(&mut format, option, option.label());
                        }
                    });
                if format != self.shell.export_format() {
                    self.shell.set_export_format(format);
                    self.settings.export_format = format;
                }
                if ui.button("Save").clicked() {
                    report(self.shell.save(&self.saves).map(|_| ()));
                }
                #[cfg(not(target_arch = "wasm32"))]
                if ui.button("Download").clicked() {
                    let name = crate::shell::save_name(format);
                    report(self.shell.download(std::path::Path::new(&name)));
                }

                if let Some(status) = self.shell.status() {
                    ui.separator();
                    let color = if status.is_error() {
                        Color32::from_rgb(220, 38, 38)
                    } else {
                        ui.visuals().text_color()
                    };
                    ui.colored_label(color, status.text());
                }
            });
        });
    }

    fn start_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mode = self.shell.mode();
                if self.shell.has_document() && ui.button("← Back to editor").clicked() {
                    self.shell.show(ShellMode::Edit);
                }
                for (target, label) in [
                    (ShellMode::TemplateGallery, "Templates"),
                    (ShellMode::StockSearch, "Stock image"),
                    (ShellMode::BlankCanvasSetup, "Blank canvas"),
                ] {
                    if ui.selectable_label(mode == target, label).clicked() {
                        self.shell.show(target);
                    }
                }
            });
            ui.separator();

            match self.shell.mode() {
                ShellMode::TemplateGallery => {
                    ui.label("Start from a template, or drop an image here.");
                    ui.horizontal_wrapped(|ui| {
                        for template in builtin_templates() {
                            let label = format!("{}\n{} × {}", template.name, template.width, template.height);
                            if ui.add_sized(vec2(140.0, 60.0), egui::Button::new(label)).clicked() {
                                self.shell.choose_template(template);
                            }
                        }
                    });
                }
                ShellMode::StockSearch => {
                    ui.label("Image URL");
                    ui.text_edit_singleline(&mut self.settings.stock_url);
                    let url = self.settings.stock_url.trim().to_owned();
                    if ui.add_enabled(!url.is_empty(), egui::Button::new("Open")).clicked() {
                        self.shell.choose_stock_image(url);
                    }
                }
                ShellMode::BlankCanvasSetup => {
                    egui::Grid::new("blank_canvas").num_columns(2).show(ui, |ui| {
                        ui.label("Width");
                        ui.add(egui::DragValue::new(&mut self.settings.blank_width).range(1..=8192));
                        ui.end_row();
                        ui.label("Height");
                        ui.add(egui::DragValue::new(&mut self.settings.blank_height).range(1..=8192));
                        ui.end_row();
                        ui.label("Background");
                        ui.color_edit_button_srgba(&mut self.settings.blank_color);
                        ui.end_row();
                    });
                    if ui.button("Create").clicked() {
                        let settings = &self.settings;
                        self.shell.create_blank(
                            settings.blank_width,
                            settings.blank_height,
                            Background::Solid(settings.blank_color),
                        );
                    }
                }
                ShellMode::Edit => {}
            }

            if let Some(status) = self.shell.status() {
                ui.separator();
                ui.label(status.text());
            }
        });
    }

    fn side_panels(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("tools_panel")
            .resizable(true)
            .default_width(180.0)
            .show(ctx, |ui| tools_panel(ui, &mut self.shell));

        egui::SidePanel::right("inspector")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                let Some((engine, tools)) = self.shell.parts_mut() else {
                    return;
                };
                if let Some(properties) = &mut self.properties {
                    egui::ScrollArea::vertical()
                        .id_salt("properties_scroll")
                        .max_height(ui.available_height() * 0.55)
                        .show(ui, |ui| properties_panel(ui, properties, engine, tools));
                }
                ui.separator();
                if let Some(layers) = &mut self.layers {
                    layers_panel(ui, layers, engine);
                }
            });
    }

    fn text_editor(&mut self, ctx: &egui::Context) {
        let Some((engine, tools)) = self.shell.parts_mut() else {
            return;
        };
        let Some(id) = tools.editing_text() else {
            self.text_target = None;
            return;
        };
        if self.text_target != Some(id) {
            self.text_buffer = engine
                .document()
                .and_then(|d| d.get(id))
                .and_then(|o| match &o.kind {
                    ObjectKind::Text(text) => Some(text.content.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            self.text_target = Some(id);
        }
        let mut done = false;
        egui::Window::new("Edit text")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.text_edit_multiline(&mut self.text_buffer);
                done = ui.button("Done").clicked();
            });
        if done {
            report(tools.commit_text(&self.text_buffer, engine));
            tools.finish_text_editing();
            self.text_target = None;
        }
    }

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_gray(48)))
            .show(ctx, |ui| {
                let container = ui.available_rect_before_wrap();
                let response = ui.allocate_rect(container, Sense::click_and_drag());
                let Some((engine, tools)) = self.shell.parts_mut() else {
                    return;
                };
                let Some((width, height)) = engine.document().map(|d| (d.width, d.height)) else {
                    ui.centered_and_justified(|ui| ui.spinner());
                    return;
                };
                if self.fitted_size != Some((width, height)) {
                    engine.fit_to_viewport(container.size());
                    self.fitted_size = Some((width, height));
                }

                let view = *engine.view();
                let canvas_rect = view.canvas_rect(width, height, container);
                let painter = ui.painter_at(container);
                paint_checkerboard(&painter, canvas_rect);
                if let Some(texture) = self.texture.texture_for(ctx, engine) {
                    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                    painter.image(texture, canvas_rect, uv, Color32::WHITE);
                }

                let to_screen = |p: Pos2| view.logical_to_screen(canvas_rect, p);
                if let Some(object) = engine.selected_object() {
                    let bounds = object.bounding_rect();
                    let rect = Rect::from_min_max(to_screen(bounds.min), to_screen(bounds.max));
                    painter.rect_stroke(rect, 0.0, Stroke::new(1.5, ACCENT));
                }
                if let Some(crop) = engine.crop_rect() {
                    paint_crop_overlay(&painter, canvas_rect, &view, crop);
                }
                if let Some(points) = tools.stroke_preview() {
                    let brush = tools.brush();
                    let color = if brush.eraser { Color32::from_white_alpha(160) } else { brush.color };
                    let screen: Vec<Pos2> = points.iter().map(|p| to_screen(*p)).collect();
                    painter.add(Shape::line(screen, Stroke::new(brush.width * view.zoom, color)));
                }

                let pointer_at = |screen: Pos2| Pointer::new(screen, view.screen_to_logical(canvas_rect, screen));
                let result = if response.drag_started() {
                    let origin = ctx.input(|i| i.pointer.press_origin()).or(response.interact_pointer_pos());
                    origin.map_or(Ok(()), |p| tools.pointer_down(pointer_at(p), engine))
                } else if response.drag_stopped() {
                    let pos = ctx.pointer_latest_pos();
                    pos.map_or(Ok(()), |p| tools.pointer_up(pointer_at(p), engine))
                } else if response.dragged() {
                    response
                        .interact_pointer_pos()
                        .map_or(Ok(()), |p| tools.pointer_move(pointer_at(p), engine))
                } else if response.clicked() {
                    match response.interact_pointer_pos() {
                        Some(p) => tools
                            .pointer_down(pointer_at(p), engine)
                            .and_then(|_| tools.pointer_up(pointer_at(p), engine)),
                        None => Ok(()),
                    }
                } else {
                    Ok(())
                };
                report(result);

                if response.hovered() {
                    ctx.set_cursor_icon(tools.cursor());
                    let (scroll, command) = ctx.input(|i| (i.raw_scroll_delta.y, i.modifiers.command));
                    if command && scroll > 0.0 {
                        engine.zoom_in();
                    } else if command && scroll < 0.0 {
                        engine.zoom_out();
                    }
                }
            });
    }
}

fn report(result: crate::error::EditorResult<()>) {
    if let Err(err) = result {
        log::warn!("{}", err);
    }
}

fn paint_checkerboard(painter: &egui::Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_gray(220));
    let cell = 12.0;
    let columns = (rect.width() / cell).ceil() as usize;
    let rows = (rect.height() / cell).ceil() as usize;
    // Too many cells at high zoom; the flat fill is enough then
    if columns * rows > 20_000 {
        return;
    }
    for row in 0..rows {
        for column in (row % 2..columns).step_by(2) {
            let min = rect.min + vec2(column as f32 * cell, row as f32 * cell);
            let tile = Rect::from_min_size(min, vec2(cell, cell)).intersect(rect);
            painter.rect_filled(tile, 0.0, Color32::from_gray(250));
        }
    }
}

fn paint_crop_overlay(painter: &egui::Painter, canvas_rect: Rect, view: &ViewState, crop: Rect) {
    let rect = Rect::from_min_max(
        view.logical_to_screen(canvas_rect, crop.min),
        view.logical_to_screen(canvas_rect, crop.max),
    );
    let shade = Color32::from_black_alpha(140);
    let outer = canvas_rect;
    for band in [
        Rect::from_min_max(outer.min, pos2(outer.max.x, rect.min.y)),
        Rect::from_min_max(pos2(outer.min.x, rect.max.y), outer.max),
        Rect::from_min_max(pos2(outer.min.x, rect.min.y), pos2(rect.min.x, rect.max.y)),
        Rect::from_min_max(pos2(rect.max.x, rect.min.y), pos2(outer.max.x, rect.max.y)),
    ] {
        if band.is_positive() {
            painter.rect_filled(band, 0.0, shade);
        }
    }
    painter.rect_stroke(rect, 0.0, Stroke::new(1.5, Color32::WHITE));
    for corner in [rect.left_top(), rect.right_top(), rect.left_bottom(), rect.right_bottom()] {
        painter.rect_filled(Rect::from_center_size(corner, vec2(8.0, 8.0)), 1.0, ACCENT);
    }
}

impl eframe::App for PhotoCanvasApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_mounted();
        self.shell.tick();
        if matches!(self.shell.status(), Some(Status::Busy(_))) {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
        self.handle_dropped_files(ctx);
        self.handle_shortcuts(ctx);
        self.top_bar(ctx);

        if self.shell.mode() != ShellMode::Edit {
            self.start_screen(ctx);
            return;
        }
        self.side_panels(ctx);
        self.text_editor(ctx);
        self.canvas(ctx);
    }
}
