use egui::{Color32, Ui};
use std::cell::Cell;
use std::rc::Rc;

use crate::document::{
    ImageFilters, ObjectId, ObjectKind, Paint, Shadow, ShapeStyle, TextAlign, TextStroke, TextStyle,
};
use crate::engine::{CanvasEngine, FilterAdjustment};
use crate::error::EditorResult;
use crate::event::EditorEvent;
use crate::tool::{BrushSettings, ToolController, ToolKind};

/// Attributes shown for the current selection or tool
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesView {
    /// No document yet
    Empty,
    /// Nothing selected: the background pseudo-layer
    Canvas { width: u32, height: u32 },
    Text {
        id: ObjectId,
        content: String,
        style: TextStyle,
        opacity: f32,
        angle: f32,
    },
    Shape {
        id: ObjectId,
        kind: &'static str,
        style: ShapeStyle,
        opacity: f32,
        angle: f32,
    },
    Image {
        id: ObjectId,
        filters: ImageFilters,
        opacity: f32,
        angle: f32,
    },
    Group { id: ObjectId, opacity: f32, angle: f32 },
    /// Creation-time defaults of the draw tool
    Brush(BrushSettings),
    /// Filter tool with no selection: edits the base image, if any
    Filters(Option<(ObjectId, ImageFilters)>),
}

impl PropertiesView {
    pub fn target(&self) -> Option<ObjectId> {
        match self {
            PropertiesView::Text { id, .. }
            | PropertiesView::Shape { id, .. }
            | PropertiesView::Image { id, .. }
            | PropertiesView::Group { id, .. } => Some(*id),
            PropertiesView::Filters(target) => target.map(|(id, _)| id),
            _ => None,
        }
    }
}

/// One attribute edit. Each is applied to the live object immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEdit {
    TextContent(String),
    TextStyle(TextStyle),
    TextAlign(TextAlign),
    ShapeStyle(ShapeStyle),
    Opacity(f32),
    Angle(f32),
    Filter(FilterAdjustment),
    Brush(BrushSettings),
}

pub struct PropertiesPanel {
    dirty: Rc<Cell<bool>>,
    shown_for: Option<ToolKind>,
    view: PropertiesView,
}

impl std::fmt::Debug for PropertiesPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertiesPanel")
            .field("dirty", &self.dirty.get())
            .field("view", &self.view)
            .finish()
    }
}

impl PropertiesPanel {
    /// Create the panel and subscribe it to `engine`
    pub fn attach(engine: &CanvasEngine) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        engine.subscribe(Box::new(move |event: &EditorEvent| {
            if event.is_structural()
                || matches!(event, EditorEvent::SelectionChanged(_) | EditorEvent::RestoreFinished)
            {
                flag.set(true);
            }
        }));
        Self {
            dirty,
            shown_for: None,
            view: PropertiesView::Empty,
        }
    }

    pub fn view(&self) -> &PropertiesView {
        &self.view
    }

    /// Rebuild the view if anything it shows changed
    pub fn refresh(&mut self, engine: &CanvasEngine, tools: &ToolController) -> &PropertiesView {
        let tool = tools.active();
        let brush_changed = matches!(&self.view, PropertiesView::Brush(b) if b != tools.brush());
        if self.dirty.get() || self.shown_for != Some(tool) || brush_changed {
            self.view = build_view(engine, tools);
            self.shown_for = Some(tool);
            self.dirty.set(false);
        }
        &self.view
    }

    pub fn apply(&mut self, edit: PropertyEdit, engine: &mut CanvasEngine, tools: &mut ToolController) -> EditorResult<()> {
        if let PropertyEdit::Brush(brush) = edit {
            tools.set_brush(brush);
            self.view = PropertiesView::Brush(brush);
            return Ok(());
        }
        let Some(id) = self.view.target() else {
            return Ok(());
        };
        match edit {
            PropertyEdit::TextContent(content) => engine.set_text_content(id, &content)?,
            PropertyEdit::TextStyle(style) => engine.set_text_style(id, style)?,
            PropertyEdit::TextAlign(align) => engine.set_text_align(id, align)?,
            PropertyEdit::ShapeStyle(style) => engine.set_shape_style(id, style)?,
            PropertyEdit::Opacity(opacity) => engine.set_opacity(id, opacity)?,
            PropertyEdit::Angle(angle) => engine.set_angle(id, angle)?,
            PropertyEdit::Filter(adjustment) => engine.apply_filter(id, adjustment)?,
            PropertyEdit::Brush(_) => {}
        }
        self.view = build_view(engine, tools);
        Ok(())
    }
}

fn build_view(engine: &CanvasEngine, tools: &ToolController) -> PropertiesView {
    let Some(document) = engine.document() else {
        return PropertiesView::Empty;
    };
    if tools.active() == ToolKind::Draw {
        return PropertiesView::Brush(*tools.brush());
    }
    let Some(object) = engine.selected_object() else {
        if matches!(tools.active(), ToolKind::Filter | ToolKind::BackgroundRemove) {
            let base = engine.base_image().and_then(|id| {
                document.get(id).and_then(|o| match &o.kind {
                    ObjectKind::Image(image) => Some((id, image.filters)),
                    _ => None,
                })
            });
            return PropertiesView::Filters(base);
        }
        return PropertiesView::Canvas {
            width: document.width,
            height: document.height,
        };
    };
    let (id, opacity, angle) = (object.id, object.opacity, object.transform.angle);
    match &object.kind {
        ObjectKind::Text(text) => PropertiesView::Text {
            id,
            content: text.content.clone(),
            style: text.style.clone(),
            opacity,
            angle,
        },
        ObjectKind::Image(image) => PropertiesView::Image {
            id,
            filters: image.filters,
            opacity,
            angle,
        },
        ObjectKind::Group { .. } => PropertiesView::Group { id, opacity, angle },
        kind => PropertiesView::Shape {
            id,
            kind: kind.name(),
            style: kind.shape_style().copied().unwrap_or_default(),
            opacity,
            angle,
        },
    }
}

/// Slider that batches a drag into one history entry
fn batched_slider(
    ui: &mut Ui,
    engine: &mut CanvasEngine,
    value: &mut f32,
    range: std::ops::RangeInclusive<f32>,
    label: &str,
) -> bool {
    let response = ui.add(egui::Slider::new(value, range).text(label));
    if response.drag_started() {
        engine.begin_interaction();
    }
    if response.drag_stopped() {
        if let Err(err) = engine.commit_interaction() {
            log::error!("{}", err);
        }
    }
    response.changed()
}

/// Draw the panel and apply whatever the user edits
pub fn properties_panel(
    ui: &mut Ui,
    panel: &mut PropertiesPanel,
    engine: &mut CanvasEngine,
    tools: &mut ToolController,
) {
    ui.heading("Properties");
    let view = panel.refresh(engine, tools).clone();
    let mut edits = Vec::new();

    match view {
        PropertiesView::Empty => {
            ui.label("Open an image or pick a template to start editing.");
        }
        PropertiesView::Canvas { width, height } => {
            ui.label(format!("Canvas {} × {}", width, height));
        }
        PropertiesView::Brush(mut brush) => {
            let mut changed = ui.color_edit_button_srgba(&mut brush.color).changed();
            changed |= ui
                .add(egui::Slider::new(&mut brush.width, 1.0..=100.0).text("Width"))
                .changed();
            changed |= ui.checkbox(&mut brush.eraser, "Eraser").changed();
            if changed {
                edits.push(PropertyEdit::Brush(brush));
            }
        }
        PropertiesView::Text {
            mut content,
            mut style,
            mut opacity,
            mut angle,
            ..
        } => {
            if ui.text_edit_multiline(&mut content).lost_focus() {
                edits.push(PropertyEdit::TextContent(content));
            }
            let mut changed = false;
            ui.horizontal(|ui| {
                ui.label("Font");
                changed |= egui::ComboBox::from_id_salt("font_family")
                    .selected_text(style.font_family.clone())
                    .show_ui(ui, |ui| {
                        let mut picked = false;
                        for family in ["Ubuntu", "Monospace"] {
                            picked |= ui
                                .selectable_value(&mut style.font_family, family.to_owned(), family)
                                .changed();
                        }
                        picked
                    })
                    .inner
                    .unwrap_or(false);
            });
            changed |= batched_slider(ui, engine, &mut style.font_size, 6.0..=200.0, "Size");
            ui.horizontal(|ui| {
                changed |= ui.color_edit_button_srgba(&mut style.color).changed();
                changed |= ui.toggle_value(&mut style.bold, "B").changed();
                changed |= ui.toggle_value(&mut style.italic, "I").changed();
                changed |= ui.toggle_value(&mut style.underline, "U").changed();
            });
            let mut align = style.align;
            ui.horizontal(|ui| {
                for option in TextAlign::ALL {
                    ui.selectable_value(&mut align, option, option.label());
                }
            });
            if align != style.align {
                edits.push(PropertyEdit::TextAlign(align));
            }

            let mut has_stroke = style.stroke.is_some();
            if ui.checkbox(&mut has_stroke, "Stroke").changed() {
                style.stroke = has_stroke.then_some(TextStroke {
                    color: Color32::WHITE,
                    width: 2.0,
                });
                changed = true;
            }
            if let Some(stroke) = &mut style.stroke {
                ui.horizontal(|ui| {
                    changed |= ui.color_edit_button_srgba(&mut stroke.color).changed();
                    changed |= ui
                        .add(egui::Slider::new(&mut stroke.width, 0.5..=20.0).text("Stroke width"))
                        .changed();
                });
            }
            let mut has_shadow = style.shadow.is_some();
            if ui.checkbox(&mut has_shadow, "Shadow").changed() {
                style.shadow = has_shadow.then(Shadow::default);
                changed = true;
            }
            if let Some(shadow) = &mut style.shadow {
                ui.horizontal(|ui| {
                    changed |= ui.color_edit_button_srgba(&mut shadow.color).changed();
                    changed |= ui
                        .add(egui::Slider::new(&mut shadow.blur, 0.0..=20.0).text("Blur"))
                        .changed();
                });
            }
            if changed {
                edits.push(PropertyEdit::TextStyle(style));
            }
            object_controls(ui, engine, &mut opacity, &mut angle, &mut edits);
        }
        PropertiesView::Shape {
            kind,
            mut style,
            mut opacity,
            mut angle,
            ..
        } => {
            ui.label(kind);
            let mut changed = false;
            let mut fill = style.fill.map(|p| p.primary_color()).unwrap_or(Color32::TRANSPARENT);
            ui.horizontal(|ui| {
                ui.label("Fill");
                if ui.color_edit_button_srgba(&mut fill).changed() {
                    style.fill = Some(Paint::Solid(fill));
                    changed = true;
                }
            });
            let mut stroke = style.stroke.unwrap_or(Color32::BLACK);
            ui.horizontal(|ui| {
                ui.label("Stroke");
                if ui.color_edit_button_srgba(&mut stroke).changed() {
                    style.stroke = Some(stroke);
                    changed = true;
                }
            });
            changed |= batched_slider(ui, engine, &mut style.stroke_width, 0.0..=50.0, "Stroke width");
            if changed {
                edits.push(PropertyEdit::ShapeStyle(style));
            }
            object_controls(ui, engine, &mut opacity, &mut angle, &mut edits);
        }
        PropertiesView::Image {
            filters,
            mut opacity,
            mut angle,
            ..
        } => {
            filter_controls(ui, engine, filters, &mut edits);
            object_controls(ui, engine, &mut opacity, &mut angle, &mut edits);
        }
        PropertiesView::Group {
            mut opacity,
            mut angle,
            ..
        } => object_controls(ui, engine, &mut opacity, &mut angle, &mut edits),
        PropertiesView::Filters(Some((_, filters))) => filter_controls(ui, engine, filters, &mut edits),
        PropertiesView::Filters(None) => {
            ui.label("Select an image to adjust its filters.");
        }
    }

    for edit in edits {
        if let Err(err) = panel.apply(edit, engine, tools) {
            log::warn!("Property edit rejected: {}", err);
        }
    }
}

fn object_controls(ui: &mut Ui, engine: &mut CanvasEngine, opacity: &mut f32, angle: &mut f32, edits: &mut Vec<PropertyEdit>) {
    ui.separator();
    if batched_slider(ui, engine, opacity, 0.0..=1.0, "Opacity") {
        edits.push(PropertyEdit::Opacity(*opacity));
    }
    if batched_slider(ui, engine, angle, 0.0..=360.0, "Rotation") {
        edits.push(PropertyEdit::Angle(*angle));
    }
}

fn filter_controls(ui: &mut Ui, engine: &mut CanvasEngine, mut filters: ImageFilters, edits: &mut Vec<PropertyEdit>) {
    if batched_slider(ui, engine, &mut filters.brightness, -1.0..=1.0, "Brightness") {
        edits.push(PropertyEdit::Filter(FilterAdjustment::Brightness(filters.brightness)));
    }
    if batched_slider(ui, engine, &mut filters.contrast, -1.0..=1.0, "Contrast") {
        edits.push(PropertyEdit::Filter(FilterAdjustment::Contrast(filters.contrast)));
    }
    if batched_slider(ui, engine, &mut filters.saturation, -1.0..=1.0, "Saturation") {
        edits.push(PropertyEdit::Filter(FilterAdjustment::Saturation(filters.saturation)));
    }
    if batched_slider(ui, engine, &mut filters.blur, 0.0..=1.0, "Blur") {
        edits.push(PropertyEdit::Filter(FilterAdjustment::Blur(filters.blur)));
    }
    ui.horizontal(|ui| {
        if ui.toggle_value(&mut filters.grayscale, "Grayscale").changed() {
            edits.push(PropertyEdit::Filter(FilterAdjustment::Grayscale(filters.grayscale)));
        }
        if ui.toggle_value(&mut filters.sepia, "Sepia").changed() {
            edits.push(PropertyEdit::Filter(FilterAdjustment::Sepia(filters.sepia)));
        }
        if ui.toggle_value(&mut filters.invert, "Invert").changed() {
            edits.push(PropertyEdit::Filter(FilterAdjustment::Invert(filters.invert)));
        }
    });
}
