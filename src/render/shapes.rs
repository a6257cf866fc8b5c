use egui::{Color32, Pos2, Rect, pos2};
use image::RgbaImage;
use std::sync::Arc;

use super::{LocalRaster, over, premultiplied, raster_size, to_rgba};
use crate::document::{
    ObjectKind, Paint, ShapeStyle, distance_to_polygon_edge, distance_to_polyline, point_in_polygon,
};

/// Sub-pixel sample offsets (2x2 supersampling)
const SAMPLES: [(f32, f32); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

enum Outline<'a> {
    Box(Rect),
    Ellipse { center: Pos2, radius: f32 },
    Polygon(Vec<Pos2>),
    Polyline(&'a [Pos2]),
}

impl Outline<'_> {
    fn inside(&self, p: Pos2) -> bool {
        match self {
            Outline::Box(rect) => rect.contains(p),
            Outline::Ellipse { center, radius } => (p - *center).length() <= *radius,
            Outline::Polygon(points) => point_in_polygon(p, points),
            Outline::Polyline(_) => false,
        }
    }

    fn edge_distance(&self, p: Pos2) -> f32 {
        match self {
            Outline::Box(rect) => {
                let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
                distance_to_polygon_edge(p, &corners)
            }
            Outline::Ellipse { center, radius } => ((p - *center).length() - radius).abs(),
            Outline::Polygon(points) => distance_to_polygon_edge(p, points),
            Outline::Polyline(points) => distance_to_polyline(p, points),
        }
    }
}

/// Rasterize a vector shape over its local bounds at `resolution` pixels per unit
pub(crate) fn rasterize_shape(kind: &ObjectKind, bounds: Rect, resolution: f32) -> Option<LocalRaster> {
    let (outline, paint_box, style) = match kind {
        ObjectKind::Rectangle { width, height, style } => {
            let area = Rect::from_min_size(Pos2::ZERO, egui::vec2(*width, *height));
            (Outline::Box(area), area, style)
        }
        ObjectKind::Circle { radius, style } => {
            let center = pos2(*radius, *radius);
            let area = Rect::from_center_size(center, egui::Vec2::splat(radius * 2.0));
            (Outline::Ellipse { center, radius: *radius }, area, style)
        }
        ObjectKind::Triangle { width, height, style } => {
            let points = vec![pos2(0.0, *height), pos2(width / 2.0, 0.0), pos2(*width, *height)];
            let area = Rect::from_min_size(Pos2::ZERO, egui::vec2(*width, *height));
            (Outline::Polygon(points), area, style)
        }
        ObjectKind::Polygon { points, style } => {
            (Outline::Polygon(points.clone()), bounds.shrink(style.stroke_padding()), style)
        }
        ObjectKind::Line { points, style, .. } => (Outline::Polyline(points), bounds, style),
        _ => return None,
    };

    let (width, height) = raster_size(bounds, resolution)?;
    let mut pixels = RgbaImage::new(width, height);
    let half_stroke = match outline {
        Outline::Polyline(_) => (style.stroke_width / 2.0).max(0.5),
        _ => style.stroke_padding(),
    };
    let stroke = style.stroke.map(premultiplied);

    for (x, y, pixel) in pixels.enumerate_pixels_mut() {
        let mut sum = [0.0f32; 4];
        for (dx, dy) in SAMPLES {
            let p = pos2(
                bounds.min.x + (x as f32 + dx) / resolution,
                bounds.min.y + (y as f32 + dy) / resolution,
            );
            let sample = shade(&outline, style, paint_box, half_stroke, stroke, p);
            for (acc, value) in sum.iter_mut().zip(sample) {
                *acc += value;
            }
        }
        *pixel = to_rgba(sum.map(|v| v / SAMPLES.len() as f32));
    }

    Some(LocalRaster {
        pixels: Arc::new(pixels),
        origin: bounds.min,
        resolution,
    })
}

fn shade(
    outline: &Outline<'_>,
    style: &ShapeStyle,
    paint_box: Rect,
    half_stroke: f32,
    stroke: Option<[f32; 4]>,
    p: Pos2,
) -> [f32; 4] {
    let mut color = [0.0; 4];
    if let Some(fill) = &style.fill {
        if outline.inside(p) {
            color = premultiplied(paint_color(fill, paint_box, p));
        }
    }
    if let Some(stroke) = stroke {
        if half_stroke > 0.0 && outline.edge_distance(p) <= half_stroke {
            color = over(color, stroke);
        }
    }
    color
}

fn paint_color(paint: &Paint, area: Rect, p: Pos2) -> Color32 {
    let u = if area.width() > 0.0 { (p.x - area.min.x) / area.width() } else { 0.0 };
    let v = if area.height() > 0.0 { (p.y - area.min.y) / area.height() } else { 0.0 };
    paint.color_at(u, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeStyle;

    #[test]
    fn solid_rectangle_fills_every_pixel() {
        let kind = ObjectKind::Rectangle {
            width: 4.0,
            height: 3.0,
            style: ShapeStyle {
                fill: Some(Paint::Solid(Color32::RED)),
                stroke: None,
                stroke_width: 0.0,
            },
        };
        let bounds = Rect::from_min_size(Pos2::ZERO, egui::vec2(4.0, 3.0));
        let raster = rasterize_shape(&kind, bounds, 1.0).unwrap();
        assert_eq!(raster.pixels.dimensions(), (4, 3));
        assert!(raster.pixels.pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn circle_corners_stay_transparent() {
        let kind = ObjectKind::Circle {
            radius: 10.0,
            style: ShapeStyle::default(),
        };
        let bounds = Rect::from_min_size(Pos2::ZERO, egui::vec2(20.0, 20.0));
        let raster = rasterize_shape(&kind, bounds, 1.0).unwrap();
        assert_eq!(raster.pixels.get_pixel(0, 0).0[3], 0);
        assert_eq!(raster.pixels.get_pixel(10, 10).0[3], 255);
    }
}
