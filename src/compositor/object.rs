use super::{flip_transform, Batch, SceneContext};
use crate::color::mul_color;
use crate::command::{DrawCommand, DrawKind, DrawOrigin, Shape};
use crate::config::ShapePolicy;
use crate::error::{MapError, Result, TileLocation};
use crate::gid::TileInstance;
use crate::layer_info::LayerInfo;
use crate::map::{DrawOrder, Object, ObjectGroup, ObjectShape};
use macroquad::math::{vec2, Affine2, Vec2};

/// Object group: one command per visible object.
#[derive(Debug)]
pub struct ObjectCompositor<'m> {
    group: &'m ObjectGroup,
    pub(crate) info: LayerInfo,
    ctx: SceneContext<'m>,
    pub(crate) batch: Batch,
    pub(crate) diagnostics: Vec<MapError>,
}

/// Rotation about `pivot`, then the box placed at `min`. Degrees, clockwise
/// on a y-down screen.
fn placement(min: Vec2, pivot: Vec2, rotation: Option<f32>) -> Affine2 {
    match rotation {
        Some(deg) if deg != 0.0 => {
            Affine2::from_translation(pivot)
                * Affine2::from_angle(deg.to_radians())
                * Affine2::from_translation(min - pivot)
        }
        _ => Affine2::from_translation(min),
    }
}

impl<'m> ObjectCompositor<'m> {
    pub(crate) fn new(group: &'m ObjectGroup, info: LayerInfo, ctx: SceneContext<'m>) -> Result<Self> {
        let mut c = ObjectCompositor {
            group,
            info,
            ctx,
            batch: Batch::default(),
            diagnostics: Vec::new(),
        };
        c.update()?;
        Ok(c)
    }

    /// Objects in draw order, invisible ones dropped.
    pub fn draw_order(&self) -> Vec<&'m Object> {
        let mut objects: Vec<&'m Object> = self.group.objects.iter().filter(|o| o.visible).collect();
        if self.group.draw_order == DrawOrder::TopDown {
            objects.sort_by(|a, b| a.y.total_cmp(&b.y));
        }
        objects
    }

    /// Re-sorts the objects and rebuilds their commands.
    pub fn update(&mut self) -> Result<()> {
        self.batch.clear();
        self.diagnostics.clear();

        for object in self.draw_order() {
            match self.command_for(object) {
                Ok(cmd) => self.batch.push(cmd),
                Err(err @ MapError::UnsupportedShape { .. })
                    if self.ctx.options.unsupported_shapes == ShapePolicy::Report =>
                {
                    log::warn!("{err}; object skipped");
                    self.diagnostics.push(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn command_for(&self, object: &Object) -> Result<DrawCommand> {
        match object.gid {
            Some(tile) if !tile.is_empty() => self.tile_object(object, tile),
            _ => self.shape_object(object),
        }
    }

    fn tile_object(&self, object: &Object, tile: TileInstance) -> Result<DrawCommand> {
        let info = &self.info;
        let tile = tile.decode();
        let entry = self.ctx.resources.entry(tile.id).ok_or_else(|| MapError::UnknownTile {
            layer: info.name.clone(),
            location: TileLocation::Object(object.id),
            gid: tile.id,
        })?;

        let source_size = vec2(entry.source.w, entry.source.h);
        let size = object.size().unwrap_or(source_size);
        // Tile objects hang upwards from their position.
        let anchor = info.offset + vec2(object.x, object.y) + entry.offset;
        let min = anchor - vec2(0.0, size.y);
        let pivot = match object.size() {
            Some(_) => min + size / 2.0,
            None => anchor,
        };
        let document = placement(min, pivot, object.rotation)
            * Affine2::from_scale(size / source_size)
            * flip_transform(tile, source_size);

        Ok(DrawCommand {
            origin: self.origin(object),
            kind: DrawKind::Sprite {
                image: entry.image,
                source: entry.source,
            },
            transform: info.place_sprite(document, source_size.y),
            tint: info.color,
        })
    }

    fn shape_object(&self, object: &Object) -> Result<DrawCommand> {
        let size = object.size().unwrap_or(Vec2::ZERO);
        let mut tint = self.info.color;
        let shape = match &object.shape {
            ObjectShape::Rectangle => Shape::Rectangle { size },
            ObjectShape::Ellipse => Shape::Ellipse { size },
            ObjectShape::Point => Shape::Point,
            ObjectShape::Polygon(points) => Shape::Polygon {
                points: points.clone(),
            },
            ObjectShape::Polyline(points) => Shape::Polyline {
                points: points.clone(),
            },
            ObjectShape::Text(text) => {
                tint = mul_color(tint, text.color);
                Shape::Text {
                    text: text.text.clone(),
                    size,
                    pixel_size: text.pixel_size,
                    wrap: text.wrap,
                    halign: text.halign,
                    valign: text.valign,
                }
            }
            ObjectShape::Unrecognized(name) => {
                return Err(MapError::UnsupportedShape {
                    layer: self.info.name.clone(),
                    object_id: object.id,
                    shape: name.clone(),
                })
            }
        };

        let min = self.info.offset + vec2(object.x, object.y);
        let pivot = match object.size() {
            Some(s) => min + s / 2.0,
            None => min,
        };
        Ok(DrawCommand {
            origin: self.origin(object),
            kind: DrawKind::Shape(shape),
            transform: self.info.place_shape(placement(min, pivot, object.rotation)),
            tint,
        })
    }

    fn origin(&self, object: &Object) -> DrawOrigin {
        DrawOrigin::Object {
            layer: self.info.name.clone(),
            id: object.id,
        }
    }

    /// Cached commands, in draw order
    pub fn commands(&self) -> &[DrawCommand] {
        &self.batch.commands
    }

    /// Shapes skipped during the last update
    pub fn diagnostics(&self) -> &[MapError] {
        &self.diagnostics
    }
}
