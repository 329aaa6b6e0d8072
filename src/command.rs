//! Draw commands handed to a renderer.
//!
//! Every command carries a full affine transform from its local space
//! (source-rectangle pixels for sprites, object pixels for shapes) into the
//! target space, and a multiplicative tint. No blending happens here.

use crate::map::{HAlign, VAlign};
use crate::tileset::ImageHandle;
use macroquad::color::Color;
use macroquad::math::{vec2, Affine2, Rect, Vec2};

/// Which part of the document produced a command.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DrawOrigin {
    /// Tile layer cell
    Cell { layer: String, index: u32 },
    /// Object group member
    Object { layer: String, id: u32 },
    /// Image layer
    Image { layer: String },
}

/// Geometry of a non-sprite command, in local pixels.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Shape {
    /// Axis-aligned box from the local origin
    Rectangle { size: Vec2 },
    /// Ellipse inscribed in `0..size`
    Ellipse { size: Vec2 },
    /// Single point at the local origin
    Point,
    /// Closed outline
    Polygon { points: Vec<Vec2> },
    /// Open outline
    Polyline { points: Vec<Vec2> },
    /// Text laid out inside `0..size`
    Text {
        text: String,
        size: Vec2,
        pixel_size: u32,
        wrap: bool,
        halign: HAlign,
        valign: VAlign,
    },
}

impl Shape {
    /// Local bounding box
    pub fn local_bounds(&self) -> Rect {
        match self {
            Shape::Rectangle { size } | Shape::Ellipse { size } | Shape::Text { size, .. } => {
                Rect::new(0.0, 0.0, size.x, size.y)
            }
            Shape::Point => Rect::new(0.0, 0.0, 0.0, 0.0),
            Shape::Polygon { points } | Shape::Polyline { points } => bounding_rect(points.iter().copied()),
        }
    }
}

/// What a command draws.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    /// A region of a shared image
    Sprite {
        /// Shared image
        image: ImageHandle,
        /// Pixel rectangle inside the image
        source: Rect,
    },
    /// Vector geometry, filled or stroked with the tint
    Shape(Shape),
}

/// One renderer instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Producer, for debugging and picking
    pub origin: DrawOrigin,
    /// Payload
    pub kind: DrawKind,
    /// Local → target
    pub transform: Affine2,
    /// Multiplier applied to every pixel
    pub tint: Color,
}

impl DrawCommand {
    /// Local-space rectangle covered by the command
    pub fn local_bounds(&self) -> Rect {
        match &self.kind {
            DrawKind::Sprite { source, .. } => Rect::new(0.0, 0.0, source.w, source.h),
            DrawKind::Shape(shape) => shape.local_bounds(),
        }
    }

    /// Axis-aligned bounds in target space.
    pub fn bounds(&self) -> Rect {
        let r = self.local_bounds();
        let corners = [
            vec2(r.x, r.y),
            vec2(r.x + r.w, r.y),
            vec2(r.x, r.y + r.h),
            vec2(r.x + r.w, r.y + r.h),
        ];
        bounding_rect(corners.into_iter().map(|c| self.transform.transform_point2(c)))
    }
}

pub(crate) fn bounding_rect(points: impl IntoIterator<Item = Vec2>) -> Rect {
    let mut it = points.into_iter();
    let Some(first) = it.next() else {
        return Rect::new(0.0, 0.0, 0.0, 0.0);
    };
    let (min, max) = it.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

/// Union of two optional rectangles.
pub(crate) fn union(a: Option<Rect>, b: Rect) -> Rect {
    match a {
        Some(a) => a.combine_with(b),
        None => b,
    }
}

/// Anything draw commands can be emitted into.
pub trait RenderTarget {
    /// Receives one command, in draw order.
    fn draw(&mut self, command: &DrawCommand);
}

/// Recording target
impl RenderTarget for Vec<DrawCommand> {
    fn draw(&mut self, command: &DrawCommand) {
        self.push(command.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::color::WHITE;

    #[test]
    fn bounds_follow_the_transform() {
        let cmd = DrawCommand {
            origin: DrawOrigin::Image { layer: "bg".into() },
            kind: DrawKind::Sprite {
                image: ImageHandle(0),
                source: Rect::new(32.0, 0.0, 16.0, 8.0),
            },
            transform: Affine2::from_translation(vec2(100.0, 50.0))
                * Affine2::from_angle(std::f32::consts::FRAC_PI_2),
            tint: WHITE,
        };
        let b = cmd.bounds();
        assert!((b.x - 92.0).abs() < 1e-4 && (b.y - 50.0).abs() < 1e-4);
        assert!((b.w - 8.0).abs() < 1e-4 && (b.h - 16.0).abs() < 1e-4);
    }

    #[test]
    fn polyline_bounds_cover_negative_points() {
        let shape = Shape::Polyline {
            points: vec![vec2(0.0, 0.0), vec2(-4.0, 10.0), vec2(6.0, -2.0)],
        };
        assert_eq!(shape.local_bounds(), Rect::new(-4.0, -2.0, 10.0, 12.0));
    }

    #[test]
    fn vec_target_records_in_order() {
        let mut out: Vec<DrawCommand> = Vec::new();
        for id in 0..3 {
            out.draw(&DrawCommand {
                origin: DrawOrigin::Object { layer: "o".into(), id },
                kind: DrawKind::Shape(Shape::Point),
                transform: Affine2::IDENTITY,
                tint: WHITE,
            });
        }
        let ids: Vec<_> = out
            .iter()
            .map(|c| match c.origin {
                DrawOrigin::Object { id, .. } => id,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
