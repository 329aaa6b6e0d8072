//! Inherited layer state and grid/target coordinate conversion.
//!
//! A [`LayerInfo`] is never mutated: each child is derived from its parent
//! with [`compose`]. Geometry is computed in document space (origin
//! top-left, y down) and moved into the target space at the very end with
//! [`LayerInfo::place_sprite`] / [`LayerInfo::place_shape`].

use crate::color::{mul_color, parse_color};
use crate::config::YAxis;
use crate::error::{MapError, Result};
use crate::map::{Layer, Map};
use macroquad::color::{Color, WHITE};
use macroquad::math::{vec2, Affine2, Rect, Vec2};

/// What a single layer declares about itself.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct LayerLocal {
    pub name: String,
    pub offset: Vec2,
    pub opacity: Option<f32>,
    pub visible: Option<bool>,
    pub tint: Option<Color>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl LayerLocal {
    /// Reads the local attributes of `layer`, parsing its tint.
    pub fn from_layer(layer: &Layer) -> Result<Self> {
        let tint = layer
            .tint
            .as_deref()
            .map(|c| parse_color(c, &format!("layer '{}'", layer.name)))
            .transpose()?;
        Ok(LayerLocal {
            name: layer.name.clone(),
            offset: layer.offset,
            opacity: layer.opacity,
            visible: layer.visible,
            tint,
            width: layer.width,
            height: layer.height,
        })
    }

    /// Effective opacity of this node alone
    fn opacity(&self) -> f32 {
        if self.visible == Some(false) {
            0.0
        } else {
            self.opacity.unwrap_or(1.0)
        }
    }
}

/// Effective offset, color and grid size of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    /// Layer name, for error messages
    pub name: String,
    /// Accumulated pixel offset
    pub offset: Vec2,
    /// Accumulated tint; alpha carries the accumulated opacity
    pub color: Color,
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Cell size in pixels
    pub cell_size: Vec2,
    /// Pixel height of the whole map, used to flip into a y-up target
    pub map_height: f32,
    /// Target axis convention
    pub y_axis: YAxis,
}

/// Derives a child's state from its parent's.
pub fn compose(parent: &LayerInfo, local: &LayerLocal) -> LayerInfo {
    let mut own = local.tint.unwrap_or(WHITE);
    own.a *= local.opacity();
    LayerInfo {
        name: local.name.clone(),
        offset: parent.offset + local.offset,
        color: mul_color(parent.color, own),
        width: local.width.unwrap_or(parent.width),
        height: local.height.unwrap_or(parent.height),
        cell_size: parent.cell_size,
        map_height: parent.map_height,
        y_axis: parent.y_axis,
    }
}

impl LayerInfo {
    /// State of the synthetic root group: the map's grid, no offset, opaque white.
    pub fn root(map: &Map, y_axis: YAxis) -> Self {
        LayerInfo {
            name: String::new(),
            offset: Vec2::ZERO,
            color: WHITE,
            width: map.width,
            height: map.height,
            cell_size: vec2(map.tile_width as f32, map.tile_height as f32),
            map_height: map.pixel_height() as f32,
            y_axis,
        }
    }

    /// `compose(self, LayerLocal::from_layer(layer))`
    pub fn child(&self, layer: &Layer) -> Result<Self> {
        Ok(compose(self, &LayerLocal::from_layer(layer)?))
    }

    /// Accumulated opacity
    pub fn opacity(&self) -> f32 {
        self.color.a
    }

    /// Number of cells in the grid
    pub fn capacity(&self) -> u32 {
        self.width.saturating_mul(self.height)
    }

    /// `(column, row)` of a row-major cell index.
    pub fn cell_coordinates(&self, cell: u32) -> Result<(u32, u32)> {
        if cell >= self.capacity() {
            return Err(MapError::CellOutOfRange {
                layer: self.name.clone(),
                cell,
                capacity: self.capacity(),
            });
        }
        Ok((cell % self.width, cell / self.width))
    }

    /// Rectangle of a cell in document space, offset included.
    pub fn cell_rect(&self, cell: u32) -> Result<Rect> {
        let (col, row) = self.cell_coordinates(cell)?;
        let min = self.offset + vec2(col as f32, row as f32) * self.cell_size;
        Ok(Rect::new(min.x, min.y, self.cell_size.x, self.cell_size.y))
    }

    /// Rectangle of a cell in target space.
    pub fn tile_rect(&self, cell: u32) -> Result<Rect> {
        Ok(self.to_target_rect(self.cell_rect(cell)?))
    }

    /// Document point → target point
    pub fn to_target(&self, p: Vec2) -> Vec2 {
        match self.y_axis {
            YAxis::Down => p,
            YAxis::Up => vec2(p.x, self.map_height - p.y),
        }
    }

    /// Document rectangle → target rectangle; `x`/`y` stay the minimum corner.
    pub fn to_target_rect(&self, r: Rect) -> Rect {
        match self.y_axis {
            YAxis::Down => r,
            YAxis::Up => Rect::new(r.x, self.map_height - (r.y + r.h), r.w, r.h),
        }
    }

    /// The document → target mapping as an affine transform.
    pub fn axis_transform(&self) -> Affine2 {
        match self.y_axis {
            YAxis::Down => Affine2::IDENTITY,
            YAxis::Up => {
                Affine2::from_translation(vec2(0.0, self.map_height))
                    * Affine2::from_scale(vec2(1.0, -1.0))
            }
        }
    }

    /// Moves a sprite transform built in document space into the target.
    ///
    /// Sprite-local coordinates follow the target's axis, so in a y-up
    /// target local `y = 0` is the bottom row of the source rectangle and
    /// the image still reads upright.
    pub fn place_sprite(&self, document: Affine2, sprite_height: f32) -> Affine2 {
        match self.y_axis {
            YAxis::Down => document,
            YAxis::Up => {
                self.axis_transform()
                    * document
                    * Affine2::from_translation(vec2(0.0, sprite_height))
                    * Affine2::from_scale(vec2(1.0, -1.0))
            }
        }
    }

    /// Moves shape geometry built in document space into the target.
    pub fn place_shape(&self, document: Affine2) -> Affine2 {
        self.axis_transform() * document
    }
}
