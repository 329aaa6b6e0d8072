//! Macroquad backend: replays draw commands with textured quads and lines.
//!
//! Only [`MacroquadRenderer::new`] and [`RenderTarget::draw`] need a live
//! macroquad context; the geometry helpers are plain math.

use crate::command::{DrawCommand, DrawKind, RenderTarget, Shape};
use crate::config::YAxis;
use crate::tileset::{ImageHandle, Resources};
use macroquad::prelude::*;
use std::f32::consts::TAU;

const LINE_THICKNESS: f32 = 1.0;
const POINT_RADIUS: f32 = 3.0;
const ELLIPSE_SEGMENTS: usize = 32;

/// Uploads the shared images once and draws commands into the current camera.
pub struct MacroquadRenderer {
    textures: Vec<Texture2D>,
    y_axis: YAxis,
}

impl MacroquadRenderer {
    /// Creates one texture per decoded image, nearest-filtered.
    pub fn new(resources: &Resources, y_axis: YAxis) -> Self {
        let textures = resources
            .images()
            .map(|(_, _, image)| {
                let tex = Texture2D::from_image(image);
                tex.set_filter(FilterMode::Nearest);
                tex
            })
            .collect();
        MacroquadRenderer { textures, y_axis }
    }

    /// Texture uploaded for `handle`
    pub fn texture(&self, handle: ImageHandle) -> Option<&Texture2D> {
        self.textures.get(handle.index())
    }

    fn draw_sprite(&self, cmd: &DrawCommand, handle: ImageHandle, source: Rect) {
        let Some(tex) = self.texture(handle) else {
            log::warn!("no texture for image {}", handle.index());
            return;
        };
        let (vertices, indices) = sprite_quad(cmd, source, tex.size(), self.y_axis);
        draw_mesh(&Mesh {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
            texture: Some(tex.clone()),
        });
    }

    fn draw_shape(&self, cmd: &DrawCommand, shape: &Shape) {
        let color = cmd.tint;
        match shape {
            Shape::Rectangle { size } => {
                let corners = [vec2(0.0, 0.0), vec2(size.x, 0.0), *size, vec2(0.0, size.y)];
                stroke(&transformed(cmd, &corners), true, color);
            }
            Shape::Ellipse { size } => {
                stroke(&transformed(cmd, &ellipse_outline(*size, ELLIPSE_SEGMENTS)), true, color);
            }
            Shape::Point => {
                let p = cmd.transform.transform_point2(Vec2::ZERO);
                draw_circle(p.x, p.y, POINT_RADIUS, color);
            }
            Shape::Polygon { points } => stroke(&transformed(cmd, points), true, color),
            Shape::Polyline { points } => stroke(&transformed(cmd, points), false, color),
            Shape::Text { text, pixel_size, .. } => {
                let x_axis = cmd.transform.matrix2.x_axis;
                let rotation = x_axis.y.atan2(x_axis.x);
                // draw_text_ex positions the baseline
                let baseline = match self.y_axis {
                    YAxis::Down => vec2(0.0, *pixel_size as f32),
                    YAxis::Up => vec2(0.0, -(*pixel_size as f32)),
                };
                let p = cmd.transform.transform_point2(baseline);
                draw_text_ex(
                    text,
                    p.x,
                    p.y,
                    TextParams {
                        font_size: (*pixel_size).min(u16::MAX as u32) as u16,
                        rotation,
                        color,
                        ..Default::default()
                    },
                );
            }
        }
    }
}

impl RenderTarget for MacroquadRenderer {
    fn draw(&mut self, command: &DrawCommand) {
        if command.tint.a <= 0.0 {
            return;
        }
        match &command.kind {
            DrawKind::Sprite { image, source } => self.draw_sprite(command, *image, *source),
            DrawKind::Shape(shape) => self.draw_shape(command, shape),
        }
    }
}

/// Textured quad for a sprite command: corners in target space and UVs
/// into a texture of `tex_size` pixels.
pub fn sprite_quad(cmd: &DrawCommand, source: Rect, tex_size: Vec2, y_axis: YAxis) -> ([Vertex; 4], [u16; 6]) {
    let corners = [
        vec2(0.0, 0.0),
        vec2(source.w, 0.0),
        vec2(source.w, source.h),
        vec2(0.0, source.h),
    ];
    let vertices = corners.map(|local| {
        let p = cmd.transform.transform_point2(local);
        let v_px = match y_axis {
            YAxis::Down => source.y + local.y,
            YAxis::Up => source.y + source.h - local.y,
        };
        Vertex::new(
            p.x,
            p.y,
            0.0,
            (source.x + local.x) / tex_size.x,
            v_px / tex_size.y,
            cmd.tint,
        )
    });
    (vertices, [0, 1, 2, 0, 2, 3])
}

/// Outline of the ellipse inscribed in `0..size`.
pub fn ellipse_outline(size: Vec2, segments: usize) -> Vec<Vec2> {
    let center = size / 2.0;
    (0..segments)
        .map(|i| {
            let t = i as f32 / segments as f32 * TAU;
            center + vec2(t.cos(), t.sin()) * center
        })
        .collect()
}

fn transformed(cmd: &DrawCommand, points: &[Vec2]) -> Vec<Vec2> {
    points.iter().map(|p| cmd.transform.transform_point2(*p)).collect()
}

fn stroke(points: &[Vec2], closed: bool, color: Color) {
    for pair in points.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, LINE_THICKNESS, color);
    }
    if closed && points.len() > 2 {
        let (first, last) = (points[0], points[points.len() - 1]);
        draw_line(last.x, last.y, first.x, first.y, LINE_THICKNESS, color);
    }
}
