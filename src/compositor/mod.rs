//! Per-kind layer compositors.
//!
//! The set of layer kinds is closed, so a compositor is an enum with one
//! variant per kind rather than a trait object. Every compositor caches its
//! draw commands in `update()`; `draw()` only replays them.

mod group;
mod image;
mod object;
mod tile;

pub use group::GroupCompositor;
pub use image::ImageCompositor;
pub use object::ObjectCompositor;
pub use tile::TileCompositor;

use crate::command::{union, DrawCommand, RenderTarget};
use crate::config::SceneOptions;
use crate::error::{MapError, Result};
use crate::gid::DecodedGid;
use crate::layer_info::LayerInfo;
use crate::map::{Layer, LayerKind};
use crate::tileset::Resources;
use macroquad::math::{vec2, Affine2, Rect, Vec2};

/// Shared, read-only inputs of every compositor in a scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneContext<'m> {
    /// Decoded images and the gid table
    pub resources: &'m Resources,
    /// Scene-wide options
    pub options: SceneOptions,
}

/// A layer turned into draw commands.
#[derive(Debug)]
pub enum Compositor<'m> {
    /// `<layer>`
    Tiles(TileCompositor<'m>),
    /// `<objectgroup>`
    Objects(ObjectCompositor<'m>),
    /// `<imagelayer>`
    Image(ImageCompositor<'m>),
    /// `<group>` and the scene root
    Group(GroupCompositor<'m>),
}

impl<'m> Compositor<'m> {
    /// Builds (and updates once) the compositor matching `layer`'s kind.
    pub fn new(layer: &'m Layer, parent: &LayerInfo, ctx: SceneContext<'m>) -> Result<Self> {
        let info = parent.child(layer)?;
        Ok(match &layer.kind {
            LayerKind::Tiles(data) => Compositor::Tiles(TileCompositor::new(data, info, ctx)?),
            LayerKind::Objects(group) => {
                Compositor::Objects(ObjectCompositor::new(group, info, ctx)?)
            }
            LayerKind::Image(image) => {
                Compositor::Image(ImageCompositor::new(image.as_ref(), info, ctx)?)
            }
            LayerKind::Group(children) => {
                Compositor::Group(GroupCompositor::new(children, info, ctx)?)
            }
            LayerKind::Unsupported(kind) => {
                return Err(MapError::UnsupportedLayerKind { kind: kind.clone() })
            }
        })
    }

    /// Re-derives the cached geometry.
    pub fn update(&mut self) -> Result<()> {
        match self {
            Compositor::Tiles(c) => c.update(),
            Compositor::Objects(c) => c.update(),
            Compositor::Image(c) => c.update(),
            Compositor::Group(c) => c.update(),
        }
    }

    /// Emits every cached command, in order.
    pub fn draw(&self, target: &mut dyn RenderTarget) {
        match self {
            Compositor::Tiles(c) => c.batch.draw(target, None),
            Compositor::Objects(c) => c.batch.draw(target, None),
            Compositor::Image(c) => c.batch.draw(target, None),
            Compositor::Group(c) => c.draw(target, None),
        }
    }

    /// Emits only the commands whose bounds overlap `view` (target space).
    pub fn draw_visible(&self, target: &mut dyn RenderTarget, view: Rect) {
        match self {
            Compositor::Tiles(c) => c.batch.draw(target, Some(view)),
            Compositor::Objects(c) => c.batch.draw(target, Some(view)),
            Compositor::Image(c) => c.batch.draw(target, Some(view)),
            Compositor::Group(c) => c.draw(target, Some(view)),
        }
    }

    /// Target-space bounds of everything this node draws; `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Compositor::Tiles(c) => c.batch.bounds,
            Compositor::Objects(c) => c.batch.bounds,
            Compositor::Image(c) => c.batch.bounds,
            Compositor::Group(c) => c.bounds(),
        }
    }

    /// Non-fatal problems recorded during the last update, depth first.
    pub fn diagnostics(&self) -> Vec<&MapError> {
        match self {
            Compositor::Objects(c) => c.diagnostics.iter().collect(),
            Compositor::Group(c) => c.children.iter().flat_map(|c| c.diagnostics()).collect(),
            Compositor::Tiles(_) | Compositor::Image(_) => Vec::new(),
        }
    }

    /// Effective layer state this node was built with.
    pub fn info(&self) -> &LayerInfo {
        match self {
            Compositor::Tiles(c) => &c.info,
            Compositor::Objects(c) => &c.info,
            Compositor::Image(c) => &c.info,
            Compositor::Group(c) => &c.info,
        }
    }

    /// Element name of the layer kind
    pub fn kind(&self) -> &'static str {
        match self {
            Compositor::Tiles(_) => "layer",
            Compositor::Objects(_) => "objectgroup",
            Compositor::Image(_) => "imagelayer",
            Compositor::Group(_) => "group",
        }
    }

    /// Number of cached commands in this subtree
    pub fn len(&self) -> usize {
        match self {
            Compositor::Tiles(c) => c.batch.commands.len(),
            Compositor::Objects(c) => c.batch.commands.len(),
            Compositor::Image(c) => c.batch.commands.len(),
            Compositor::Group(c) => c.children.iter().map(Compositor::len).sum(),
        }
    }

    /// True when nothing would be drawn
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached commands of a leaf compositor.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub commands: Vec<DrawCommand>,
    rects: Vec<Rect>,
    pub bounds: Option<Rect>,
}

impl Batch {
    pub fn clear(&mut self) {
        self.commands.clear();
        self.rects.clear();
        self.bounds = None;
    }

    pub fn push(&mut self, command: DrawCommand) {
        let rect = command.bounds();
        self.bounds = Some(union(self.bounds, rect));
        self.rects.push(rect);
        self.commands.push(command);
    }

    pub fn draw(&self, target: &mut dyn RenderTarget, view: Option<Rect>) {
        for (cmd, rect) in self.commands.iter().zip(&self.rects) {
            if view.map_or(true, |v| v.overlaps(rect)) {
                target.draw(cmd);
            }
        }
    }
}

/// Orientation of a tile inside its `size` box.
///
/// Diagonal flip is a half turn about the box, then horizontal and vertical
/// mirrors are applied on top of it, in that order.
pub(crate) fn flip_transform(tile: DecodedGid, size: Vec2) -> Affine2 {
    let mut m = Affine2::IDENTITY;
    if tile.flip_d {
        // half turn, exact
        m = Affine2::from_translation(size) * Affine2::from_scale(vec2(-1.0, -1.0)) * m;
    }
    if tile.flip_h {
        m = Affine2::from_translation(vec2(size.x, 0.0)) * Affine2::from_scale(vec2(-1.0, 1.0)) * m;
    }
    if tile.flip_v {
        m = Affine2::from_translation(vec2(0.0, size.y)) * Affine2::from_scale(vec2(1.0, -1.0)) * m;
    }
    m
}
