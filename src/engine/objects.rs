use egui::{Color32, Pos2, Vec2, vec2};

use super::CanvasEngine;
use super::source::{ImageSource, decode_bytes};
use crate::document::{
    ImageProvenance, LineComposite, MIN_OBJECT_SIZE, Object, ObjectId, ObjectKind, ShapeStyle,
    TextAlign, TextObject, TextStyle, factory,
};
use crate::error::{EditorError, EditorResult};
use crate::event::EditorEvent;
use crate::render::FontBook;

/// Inserted images larger than this share of the canvas are scaled down to it
const INSERT_FIT: f32 = 0.8;

/// One filter edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterAdjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Blur(f32),
    Grayscale(bool),
    Sepia(bool),
    Invert(bool),
}

impl CanvasEngine {
    // ---------------------------------------------------------------------
    // Creation

    /// Insert `object` on top of the stack and select it
    pub fn add_object(&mut self, object: Object) -> EditorResult<ObjectId> {
        if object.is_background() {
            return Err(EditorError::BackgroundLayer);
        }
        let id = object.id;
        log::debug!("Adding {} {}", object.kind_name(), id);
        self.document_mut()?.objects.push(object);
        self.commit(EditorEvent::ObjectAdded(id))?;
        self.select(Some(id))?;
        Ok(id)
    }

    /// Layer another picture over the document. Without a position it is centered.
    pub fn add_image(&mut self, source: ImageSource, position: Option<Pos2>) -> EditorResult<ObjectId> {
        let pixels = source.decode().inspect_err(|e| log::error!("{}", e))?;
        self.insert_pixels(pixels, position)
    }

    pub(crate) fn insert_pixels(&mut self, pixels: image::RgbaImage, position: Option<Pos2>) -> EditorResult<ObjectId> {
        let canvas = self.document_ref()?.rect();
        let (width, height) = pixels.dimensions();
        let source = self.sources.insert(pixels);
        let mut object = factory::image(source, width, height, Pos2::ZERO, ImageProvenance::Inserted);

        let fit = (INSERT_FIT * canvas.width() / width as f32)
            .min(INSERT_FIT * canvas.height() / height as f32)
            .min(1.0);
        object.transform.scale_x = fit;
        object.transform.scale_y = fit;
        let size = vec2(width as f32 * fit, height as f32 * fit);
        let origin = position.unwrap_or(canvas.center() - size / 2.0);
        object.transform.left = origin.x;
        object.transform.top = origin.y;
        self.add_object(object)
    }

    /// Decode `bytes` and insert them as an image (file drop)
    pub fn add_image_bytes(&mut self, bytes: &[u8], position: Option<Pos2>) -> EditorResult<ObjectId> {
        let pixels = decode_bytes(bytes).inspect_err(|e| log::error!("{}", e))?;
        self.insert_pixels(pixels, position)
    }

    fn centered(&self, size: Vec2) -> EditorResult<Pos2> {
        Ok(self.document_ref()?.rect().center() - size / 2.0)
    }

    pub fn add_text(&mut self, content: &str, position: Option<Pos2>) -> EditorResult<ObjectId> {
        let mut text = TextObject {
            content: content.to_owned(),
            style: TextStyle::default(),
            lines: Vec::new(),
            line_height: 0.0,
            width: 0.0,
        };
        self.fonts.layout(&mut text);
        let size = vec2(text.width, text.height());
        let origin = match position {
            Some(pos) => pos,
            None => self.centered(size)?,
        };
        self.add_object(Object::new(ObjectKind::Text(text), origin))
    }

    pub fn add_rect(&mut self) -> EditorResult<ObjectId> {
        let origin = self.centered(vec2(200.0, 150.0))?;
        self.add_object(factory::rectangle(origin, 200.0, 150.0))
    }

    pub fn add_circle(&mut self) -> EditorResult<ObjectId> {
        let origin = self.centered(Vec2::splat(150.0))?;
        self.add_object(factory::circle(origin, 75.0))
    }

    pub fn add_triangle(&mut self) -> EditorResult<ObjectId> {
        let origin = self.centered(vec2(160.0, 140.0))?;
        self.add_object(factory::triangle(origin, 160.0, 140.0))
    }

    /// Closed polygon through `points` (canvas coordinates)
    pub fn add_polygon(&mut self, points: &[Pos2]) -> EditorResult<ObjectId> {
        if points.len() < 3 {
            return Err(EditorError::InvalidGeometry {
                width: 0.0,
                height: 0.0,
            });
        }
        self.document_ref()?;
        self.add_object(factory::polygon(points))
    }

    /// Straight polyline through `points` (canvas coordinates)
    pub fn add_line(&mut self, points: &[Pos2]) -> EditorResult<ObjectId> {
        if points.len() < 2 {
            return Err(EditorError::InvalidGeometry {
                width: 0.0,
                height: 0.0,
            });
        }
        self.document_ref()?;
        self.add_object(factory::line(points, Color32::BLACK, 4.0, LineComposite::Normal))
    }

    /// Finished freehand stroke. An eraser stroke clears what is beneath it.
    pub fn add_stroke(&mut self, points: &[Pos2], color: Color32, width: f32, eraser: bool) -> EditorResult<ObjectId> {
        let points: Vec<Pos2> = match points {
            [] => {
                return Err(EditorError::InvalidGeometry {
                    width: 0.0,
                    height: 0.0,
                });
            }
            [only] => vec![*only, *only + vec2(0.01, 0.0)],
            many => many.to_vec(),
        };
        self.document_ref()?;
        let composite = if eraser { LineComposite::Erase } else { LineComposite::Normal };
        self.add_object(factory::line(&points, color, width.max(1.0), composite))
    }

    // ---------------------------------------------------------------------
    // Mutation

    /// Apply `edit` to one object and record it, unless it changed nothing.
    ///
    /// `edit` must validate before it mutates: an error leaves the object as it was.
    fn modify<F>(&mut self, id: ObjectId, edit: F) -> EditorResult<()>
    where
        F: FnOnce(&mut Object, &FontBook) -> EditorResult<()>,
    {
        let fonts = &self.fonts;
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        let object = document.get_mut(id).ok_or(EditorError::ObjectNotFound(id))?;
        if object.is_background() {
            return Err(EditorError::BackgroundLayer);
        }
        let before = object.clone();
        edit(object, fonts)?;
        if *object == before {
            return Ok(());
        }
        self.commit(EditorEvent::ObjectModified(id))
    }

    /// Like `modify`, refusing locked objects
    fn transform<F>(&mut self, id: ObjectId, edit: F) -> EditorResult<()>
    where
        F: FnOnce(&mut Object) -> EditorResult<()>,
    {
        self.modify(id, |object, _| {
            if object.locked {
                return Err(EditorError::ObjectLocked(object.id));
            }
            edit(object)
        })
    }

    /// Move by `delta` as one frame of a drag. Never recorded on its own:
    /// call [`Self::commit_interaction`] when the drag ends.
    pub fn translate(&mut self, id: ObjectId, delta: Vec2) -> EditorResult<()> {
        let document = self.document_mut()?;
        let object = document.get_mut(id).ok_or(EditorError::ObjectNotFound(id))?;
        if object.is_background() {
            return Err(EditorError::BackgroundLayer);
        }
        if object.locked {
            return Err(EditorError::ObjectLocked(id));
        }
        object.transform.translate(delta);
        self.touch(EditorEvent::ObjectModified(id));
        Ok(())
    }

    pub fn set_position(&mut self, id: ObjectId, position: Pos2) -> EditorResult<()> {
        self.transform(id, |object| {
            object.transform.left = position.x;
            object.transform.top = position.y;
            Ok(())
        })
    }

    pub fn set_scale(&mut self, id: ObjectId, scale_x: f32, scale_y: f32) -> EditorResult<()> {
        self.transform(id, |object| {
            let local = object.local_bounds().size();
            let too_small = |s: f32, extent: f32| !s.is_finite() || (s * extent).abs() < MIN_OBJECT_SIZE.min(extent);
            if too_small(scale_x, local.x) || too_small(scale_y, local.y) {
                return Err(EditorError::InvalidGeometry {
                    width: local.x * scale_x,
                    height: local.y * scale_y,
                });
            }
            object.transform.scale_x = scale_x;
            object.transform.scale_y = scale_y;
            Ok(())
        })
    }

    /// Rotate to `degrees` about the object's center
    pub fn set_angle(&mut self, id: ObjectId, degrees: f32) -> EditorResult<()> {
        self.transform(id, |object| {
            if !degrees.is_finite() {
                return Err(EditorError::InvalidGeometry {
                    width: 0.0,
                    height: 0.0,
                });
            }
            let center = object.center();
            object.transform.angle = degrees.rem_euclid(360.0);
            let drift = center - object.center();
            object.transform.translate(drift);
            Ok(())
        })
    }

    /// Rotate by `degrees` (clockwise) about the object's center
    pub fn rotate(&mut self, id: ObjectId, degrees: f32) -> EditorResult<()> {
        let current = self
            .document_ref()?
            .get(id)
            .ok_or(EditorError::ObjectNotFound(id))?
            .transform
            .angle;
        self.set_angle(id, current + degrees)
    }

    pub fn set_opacity(&mut self, id: ObjectId, opacity: f32) -> EditorResult<()> {
        self.modify(id, |object, _| {
            object.opacity = opacity.clamp(0.0, 1.0);
            Ok(())
        })
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> EditorResult<()> {
        self.modify(id, |object, _| {
            object.visible = visible;
            Ok(())
        })
    }

    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> EditorResult<()> {
        self.modify(id, |object, _| {
            object.locked = locked;
            Ok(())
        })
    }

    pub fn set_name(&mut self, id: ObjectId, name: &str) -> EditorResult<()> {
        self.modify(id, |object, _| {
            object.name = name.to_owned();
            Ok(())
        })
    }

    pub fn set_shape_style(&mut self, id: ObjectId, style: ShapeStyle) -> EditorResult<()> {
        self.modify(id, |object, _| {
            let slot = object.kind.shape_style_mut().ok_or(EditorError::WrongKind {
                id,
                expected: "a shape",
            })?;
            *slot = ShapeStyle {
                stroke_width: style.stroke_width.max(0.0),
                ..style
            };
            Ok(())
        })
    }

    fn edit_text<F>(&mut self, id: ObjectId, edit: F) -> EditorResult<()>
    where
        F: FnOnce(&mut TextObject),
    {
        self.modify(id, |object, fonts| {
            let ObjectKind::Text(text) = &mut object.kind else {
                return Err(EditorError::WrongKind { id, expected: "text" });
            };
            edit(text);
            fonts.layout(text);
            Ok(())
        })
    }

    pub fn set_text_style(&mut self, id: ObjectId, style: TextStyle) -> EditorResult<()> {
        self.edit_text(id, |text| {
            text.style = TextStyle {
                font_size: style.font_size.max(1.0),
                ..style
            };
        })
    }

    pub fn set_text_content(&mut self, id: ObjectId, content: &str) -> EditorResult<()> {
        self.edit_text(id, |text| text.content = content.to_owned())
    }

    /// Re-align every line of a text block independently of the others' widths
    pub fn set_text_align(&mut self, id: ObjectId, align: TextAlign) -> EditorResult<()> {
        self.edit_text(id, |text| text.style.align = align)
    }

    pub fn apply_filter(&mut self, id: ObjectId, adjustment: FilterAdjustment) -> EditorResult<()> {
        self.modify(id, |object, _| {
            let ObjectKind::Image(image) = &mut object.kind else {
                return Err(EditorError::WrongKind { id, expected: "an image" });
            };
            let filters = &mut image.filters;
            match adjustment {
                FilterAdjustment::Brightness(v) => filters.brightness = v.clamp(-1.0, 1.0),
                FilterAdjustment::Contrast(v) => filters.contrast = v.clamp(-1.0, 1.0),
                FilterAdjustment::Saturation(v) => filters.saturation = v.clamp(-1.0, 1.0),
                FilterAdjustment::Blur(v) => filters.blur = v.clamp(0.0, 1.0),
                FilterAdjustment::Grayscale(on) => filters.grayscale = on,
                FilterAdjustment::Sepia(on) => filters.sepia = on,
                FilterAdjustment::Invert(on) => filters.invert = on,
            }
            Ok(())
        })
    }

    /// Bottom-most content image: what "the picture" means for canvas-wide edits
    pub fn base_image(&self) -> Option<ObjectId> {
        self.document
            .as_ref()?
            .content_objects()
            .find(|o| matches!(o.kind, ObjectKind::Image(_)))
            .map(|o| o.id)
    }
}
