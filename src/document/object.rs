use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use super::geometry::{calculate_bounds, distance_to_polyline};
use super::transform::{self, Matrix, Transform};

/// Minimum local extent of a shape, in logical pixels
pub const MIN_OBJECT_SIZE: f32 = 2.0;

/// Tolerance used when hit testing thin lines
const LINE_HIT_TOLERANCE: f32 = 4.0;

/// A unique identifier for an object on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an immutable pixel buffer held by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ObjectRole {
    #[default]
    Content,
    /// Non-interactive fill created by templates and blank canvases
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientDirection {
    Horizontal,
    Vertical,
    Diagonal,
}

/// How an area is filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(Color32),
    LinearGradient {
        from: Color32,
        to: Color32,
        direction: GradientDirection,
    },
}

impl Paint {
    /// Color at normalized position `(u, v)` inside the painted area
    pub fn color_at(&self, u: f32, v: f32) -> Color32 {
        match *self {
            Paint::Solid(color) => color,
            Paint::LinearGradient { from, to, direction } => {
                let t = match direction {
                    GradientDirection::Horizontal => u,
                    GradientDirection::Vertical => v,
                    GradientDirection::Diagonal => (u + v) * 0.5,
                };
                lerp_color(from, to, t.clamp(0.0, 1.0))
            }
        }
    }

    pub fn primary_color(&self) -> Color32 {
        match *self {
            Paint::Solid(color) => color,
            Paint::LinearGradient { from, .. } => from,
        }
    }
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let [ar, ag, ab, aa] = a.to_srgba_unmultiplied();
    let [br, bg, bb, ba] = b.to_srgba_unmultiplied();
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(mix(ar, br), mix(ag, bg), mix(ab, bb), mix(aa, ba))
}

/// Fill and outline of a vector shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub fill: Option<Paint>,
    pub stroke: Option<Color32>,
    pub stroke_width: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: Some(Paint::Solid(Color32::from_rgb(0x3b, 0x82, 0xf6))),
            stroke: None,
            stroke_width: 0.0,
        }
    }
}

impl ShapeStyle {
    pub fn outline(color: Color32, width: f32) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            stroke_width: width,
        }
    }

    /// Half the stroke width, or zero when there is no stroke
    pub fn stroke_padding(&self) -> f32 {
        if self.stroke.is_some() {
            self.stroke_width / 2.0
        } else {
            0.0
        }
    }
}

/// Adjustments applied to an image when it is rendered.
///
/// Continuous values are in `-1.0..=1.0` (`blur` in `0.0..=1.0`), zero
/// meaning untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ImageFilters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub blur: f32,
    pub grayscale: bool,
    pub sepia: bool,
    pub invert: bool,
}

impl ImageFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Stable key for caching filtered pixels
    pub fn cache_key(&self) -> [u32; 5] {
        [
            self.brightness.to_bits(),
            self.contrast.to_bits(),
            self.saturation.to_bits(),
            self.blur.to_bits(),
            (self.grayscale as u32) | (self.sepia as u32) << 1 | (self.invert as u32) << 2,
        ]
    }
}

/// Where an image's pixels came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ImageProvenance {
    #[default]
    Loaded,
    Inserted,
    BackgroundRemoved {
        original: SourceId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageObject {
    pub source: SourceId,
    pub natural_width: u32,
    pub natural_height: u32,
    pub filters: ImageFilters,
    pub provenance: ImageProvenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub const ALL: [TextAlign; 3] = [TextAlign::Left, TextAlign::Center, TextAlign::Right];

    pub fn label(&self) -> &'static str {
        match self {
            TextAlign::Left => "Left",
            TextAlign::Center => "Center",
            TextAlign::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStroke {
    pub color: Color32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub color: Color32,
    pub offset: Vec2,
    pub blur: f32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: Color32::from_black_alpha(128),
            offset: vec2(3.0, 3.0),
            blur: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub color: Color32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
    pub stroke: Option<TextStroke>,
    pub shadow: Option<Shadow>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Ubuntu".to_owned(),
            font_size: 32.0,
            color: Color32::BLACK,
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
            stroke: None,
            shadow: None,
        }
    }
}

/// One measured line of a text object, positioned inside the text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Horizontal offset of the line inside the block
    pub offset_x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    pub content: String,
    pub style: TextStyle,
    /// Per-line layout, rebuilt whenever content or style changes
    pub lines: Vec<TextLine>,
    pub line_height: f32,
    /// Width of the widest line
    pub width: f32,
}

impl TextObject {
    pub fn height(&self) -> f32 {
        self.lines.len().max(1) as f32 * self.line_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineComposite {
    #[default]
    Normal,
    /// Clears whatever is underneath (eraser strokes)
    Erase,
}

/// Kind-specific payload of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Image(ImageObject),
    Text(TextObject),
    Rectangle {
        width: f32,
        height: f32,
        style: ShapeStyle,
    },
    Circle {
        radius: f32,
        style: ShapeStyle,
    },
    /// Isosceles triangle with its apex at the top center
    Triangle {
        width: f32,
        height: f32,
        style: ShapeStyle,
    },
    /// Closed polygon; points are in local coordinates
    Polygon {
        points: Vec<Pos2>,
        style: ShapeStyle,
    },
    /// Open polyline (also used for freehand strokes); points are local
    Line {
        points: Vec<Pos2>,
        style: ShapeStyle,
        composite: LineComposite,
    },
    Group {
        children: Vec<Object>,
    },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Image(_) => "image",
            ObjectKind::Text(_) => "text",
            ObjectKind::Rectangle { .. } => "rectangle",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::Triangle { .. } => "triangle",
            ObjectKind::Polygon { .. } => "polygon",
            ObjectKind::Line { .. } => "line",
            ObjectKind::Group { .. } => "group",
        }
    }

    pub fn shape_style(&self) -> Option<&ShapeStyle> {
        match self {
            ObjectKind::Rectangle { style, .. }
            | ObjectKind::Circle { style, .. }
            | ObjectKind::Triangle { style, .. }
            | ObjectKind::Polygon { style, .. }
            | ObjectKind::Line { style, .. } => Some(style),
            _ => None,
        }
    }

    pub fn shape_style_mut(&mut self) -> Option<&mut ShapeStyle> {
        match self {
            ObjectKind::Rectangle { style, .. }
            | ObjectKind::Circle { style, .. }
            | ObjectKind::Triangle { style, .. }
            | ObjectKind::Polygon { style, .. }
            | ObjectKind::Line { style, .. } => Some(style),
            _ => None,
        }
    }
}

/// One visual element on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    pub role: ObjectRole,
    pub transform: Transform,
    pub opacity: f32,
    pub visible: bool,
    pub locked: bool,
    pub kind: ObjectKind,
}

impl Object {
    pub fn new(kind: ObjectKind, position: Pos2) -> Self {
        let name = default_name(&kind);
        Self {
            id: ObjectId::new(),
            name,
            role: ObjectRole::Content,
            transform: Transform::at(position),
            opacity: 1.0,
            visible: true,
            locked: false,
            kind,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_background(&self) -> bool {
        self.role == ObjectRole::Background
    }

    pub fn matrix(&self) -> Matrix {
        self.transform.to_matrix()
    }

    /// Bounds in the object's own (unscaled, unrotated) coordinate space
    pub fn local_bounds(&self) -> Rect {
        match &self.kind {
            ObjectKind::Image(image) => Rect::from_min_size(
                Pos2::ZERO,
                vec2(image.natural_width as f32, image.natural_height as f32),
            ),
            ObjectKind::Text(text) => {
                Rect::from_min_size(Pos2::ZERO, vec2(text.width, text.height()))
            }
            ObjectKind::Rectangle { width, height, style }
            | ObjectKind::Triangle { width, height, style } => {
                Rect::from_min_size(Pos2::ZERO, vec2(*width, *height)).expand(style.stroke_padding())
            }
            ObjectKind::Circle { radius, style } => {
                Rect::from_min_size(Pos2::ZERO, Vec2::splat(radius * 2.0)).expand(style.stroke_padding())
            }
            ObjectKind::Polygon { points, style } => calculate_bounds(points, style.stroke_padding()),
            ObjectKind::Line { points, style, .. } => calculate_bounds(points, style.stroke_width / 2.0),
            ObjectKind::Group { children } => children
                .iter()
                .map(Object::bounding_rect)
                .fold(Rect::NOTHING, |acc, r| acc.union(r)),
        }
    }

    /// Bounds of the object as displayed in its parent's coordinate space
    pub fn bounding_rect(&self) -> Rect {
        transform::map_rect(&self.matrix(), self.local_bounds())
    }

    /// Width and height as displayed (local size times scale)
    pub fn displayed_size(&self) -> Vec2 {
        let local = self.local_bounds().size();
        vec2(
            local.x * self.transform.scale_x.abs(),
            local.y * self.transform.scale_y.abs(),
        )
    }

    /// Center of the local bounds, in parent coordinates
    pub fn center(&self) -> Pos2 {
        transform::apply(&self.matrix(), self.local_bounds().center())
    }

    /// Whether `pos` (parent coordinates) lands on the object
    pub fn contains(&self, pos: Pos2) -> bool {
        let Some(inverse) = transform::invert(&self.matrix()) else {
            return false;
        };
        let local = transform::apply(&inverse, pos);
        match &self.kind {
            ObjectKind::Line { points, style, .. } => {
                distance_to_polyline(local, points) <= (style.stroke_width / 2.0).max(LINE_HIT_TOLERANCE)
            }
            ObjectKind::Group { children } => children.iter().any(|child| child.contains(local)),
            _ => self.local_bounds().contains(local),
        }
    }

    /// Pixel sources referenced by this object and its children
    pub fn collect_sources(&self, out: &mut HashSet<SourceId>) {
        match &self.kind {
            ObjectKind::Image(image) => {
                out.insert(image.source);
            }
            ObjectKind::Group { children } => {
                for child in children {
                    child.collect_sources(out);
                }
            }
            _ => {}
        }
    }

    /// Give this object (and any children) fresh identities
    pub fn regenerate_ids(&mut self) {
        self.id = ObjectId::new();
        if let ObjectKind::Group { children } = &mut self.kind {
            for child in children {
                child.regenerate_ids();
            }
        }
    }
}

fn default_name(kind: &ObjectKind) -> String {
    match kind {
        ObjectKind::Text(text) => {
            let first_line = text.content.lines().next().unwrap_or_default();
            if first_line.is_empty() {
                "Text".to_owned()
            } else {
                first_line.chars().take(24).collect()
            }
        }
        ObjectKind::Image(_) => "Image".to_owned(),
        ObjectKind::Rectangle { .. } => "Rectangle".to_owned(),
        ObjectKind::Circle { .. } => "Circle".to_owned(),
        ObjectKind::Triangle { .. } => "Triangle".to_owned(),
        ObjectKind::Polygon { .. } => "Polygon".to_owned(),
        ObjectKind::Line { composite: LineComposite::Erase, .. } => "Eraser".to_owned(),
        ObjectKind::Line { .. } => "Line".to_owned(),
        ObjectKind::Group { .. } => "Group".to_owned(),
    }
}

/// Factory functions for common objects
pub mod factory {
    use super::*;

    pub fn rectangle(position: Pos2, width: f32, height: f32) -> Object {
        Object::new(
            ObjectKind::Rectangle {
                width,
                height,
                style: ShapeStyle::default(),
            },
            position,
        )
    }

    pub fn circle(position: Pos2, radius: f32) -> Object {
        Object::new(
            ObjectKind::Circle {
                radius,
                style: ShapeStyle::default(),
            },
            position,
        )
    }

    pub fn triangle(position: Pos2, width: f32, height: f32) -> Object {
        Object::new(
            ObjectKind::Triangle {
                width,
                height,
                style: ShapeStyle::default(),
            },
            position,
        )
    }

    /// Polygon from points in parent coordinates
    pub fn polygon(points: &[Pos2]) -> Object {
        let (origin, local) = relativize(points);
        Object::new(
            ObjectKind::Polygon {
                points: local,
                style: ShapeStyle::default(),
            },
            origin,
        )
    }

    /// Polyline from points in parent coordinates
    pub fn line(points: &[Pos2], color: Color32, width: f32, composite: LineComposite) -> Object {
        let (origin, local) = relativize(points);
        Object::new(
            ObjectKind::Line {
                points: local,
                style: ShapeStyle::outline(color, width),
                composite,
            },
            origin,
        )
    }

    pub fn image(source: SourceId, width: u32, height: u32, position: Pos2, provenance: ImageProvenance) -> Object {
        Object::new(
            ObjectKind::Image(ImageObject {
                source,
                natural_width: width,
                natural_height: height,
                filters: ImageFilters::default(),
                provenance,
            }),
            position,
        )
    }

    /// Split absolute points into an origin (their top-left) and local offsets
    fn relativize(points: &[Pos2]) -> (Pos2, Vec<Pos2>) {
        let bounds = calculate_bounds(points, 0.0);
        let origin = if points.is_empty() { Pos2::ZERO } else { bounds.min };
        let local = points
            .iter()
            .map(|p| pos2(p.x - origin.x, p.y - origin.y))
            .collect();
        (origin, local)
    }
}
