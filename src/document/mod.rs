//! The document model: a fixed-size logical canvas holding an ordered list
//! of objects. The order of `objects` is the z-order; the last entry is
//! drawn on top.

mod geometry;
mod object;
mod transform;

use egui::{Color32, Pos2, Rect, vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use object::{
    factory, GradientDirection, ImageFilters, ImageObject, ImageProvenance, LineComposite,
    MIN_OBJECT_SIZE, Object, ObjectId, ObjectKind, ObjectRole, Paint, Shadow, ShapeStyle,
    SourceId, TextAlign, TextLine, TextObject, TextStroke, TextStyle,
};
pub use transform::{Matrix, Transform};
pub(crate) use geometry::{distance_to_polygon_edge, distance_to_polyline, point_in_polygon};
pub(crate) use transform::{apply as apply_matrix, invert as invert_matrix, map_rect, multiply_matrices, IDENTITY};

/// Canvas background as chosen at creation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Background {
    Solid(Color32),
    Gradient {
        from: Color32,
        to: Color32,
        direction: GradientDirection,
    },
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid(Color32::WHITE)
    }
}

impl Background {
    pub fn to_paint(&self) -> Paint {
        match *self {
            Background::Solid(color) => Paint::Solid(color),
            Background::Gradient { from, to, direction } => Paint::LinearGradient { from, to, direction },
        }
    }

    /// Color used for the canvas fill underneath all objects
    pub fn base_color(&self) -> Color32 {
        self.to_paint().primary_color()
    }
}

/// What the template gallery hands to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub background: Background,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub width: u32,
    pub height: u32,
    pub background: Background,
    pub objects: Vec<Object>,
}

impl Document {
    /// Empty document with a transparent canvas and no background object
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Background::Solid(Color32::TRANSPARENT),
            objects: Vec::new(),
        }
    }

    /// Empty document whose background is a dedicated background object
    pub fn with_background(width: u32, height: u32, background: Background) -> Self {
        let mut document = Self {
            width,
            height,
            background,
            objects: Vec::new(),
        };
        document.objects.push(background_object(width, height, background));
        document
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(self.width as f32, self.height as f32))
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn background_object(&self) -> Option<&Object> {
        self.objects.iter().find(|o| o.is_background())
    }

    /// Lowest z-index a content object may occupy
    pub fn first_content_index(&self) -> usize {
        self.objects.iter().take_while(|o| o.is_background()).count()
    }

    /// Objects excluding the background object, bottom first
    pub fn content_objects(&self) -> impl DoubleEndedIterator<Item = &Object> {
        self.objects.iter().filter(|o| !o.is_background())
    }

    pub fn source_ids(&self) -> HashSet<SourceId> {
        let mut sources = HashSet::new();
        for object in &self.objects {
            object.collect_sources(&mut sources);
        }
        sources
    }

    /// Stretch the background object (if any) over the whole canvas again
    pub(crate) fn refit_background(&mut self) {
        let (width, height, background) = (self.width, self.height, self.background);
        if let Some(object) = self.objects.iter_mut().find(|o| o.is_background()) {
            *object = Object {
                id: object.id,
                ..background_object(width, height, background)
            };
        }
    }
}

fn background_object(width: u32, height: u32, background: Background) -> Object {
    let mut object = Object::new(
        ObjectKind::Rectangle {
            width: width as f32,
            height: height as f32,
            style: ShapeStyle {
                fill: Some(background.to_paint()),
                stroke: None,
                stroke_width: 0.0,
            },
        },
        Pos2::ZERO,
    );
    object.name = "Background".to_owned();
    object.role = ObjectRole::Background;
    object.locked = true;
    object
}
