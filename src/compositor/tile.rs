use super::{flip_transform, Batch, SceneContext};
use crate::command::{DrawCommand, DrawKind, DrawOrigin};
use crate::error::{MapError, Result, TileLocation};
use crate::layer_info::LayerInfo;
use crate::map::TileData;
use macroquad::math::{vec2, Affine2};

/// Tile layer: one sprite per non-empty cell.
#[derive(Debug)]
pub struct TileCompositor<'m> {
    data: &'m TileData,
    pub(crate) info: LayerInfo,
    ctx: SceneContext<'m>,
    pub(crate) batch: Batch,
}

impl<'m> TileCompositor<'m> {
    pub(crate) fn new(data: &'m TileData, info: LayerInfo, ctx: SceneContext<'m>) -> Result<Self> {
        let mut c = TileCompositor {
            data,
            info,
            ctx,
            batch: Batch::default(),
        };
        c.update()?;
        Ok(c)
    }

    /// Decodes the grid again and rebuilds every sprite.
    pub fn update(&mut self) -> Result<()> {
        self.batch.clear();
        let info = &self.info;

        for cell in self.data.tiles(&info.name)? {
            let cell = cell?;
            if cell.tile.is_empty() {
                continue;
            }
            let tile = cell.tile.decode();
            let entry = self.ctx.resources.entry(tile.id).ok_or_else(|| MapError::UnknownTile {
                layer: info.name.clone(),
                location: TileLocation::Cell(cell.index),
                gid: tile.id,
            })?;

            let rect = info.cell_rect(cell.index)?;
            let size = vec2(entry.source.w, entry.source.h);
            // Oversized tiles grow upwards from the cell's bottom-left corner.
            let min = vec2(rect.x, rect.y + rect.h - size.y) + entry.offset;
            let document = Affine2::from_translation(min) * flip_transform(tile, size);

            self.batch.push(DrawCommand {
                origin: DrawOrigin::Cell {
                    layer: info.name.clone(),
                    index: cell.index,
                },
                kind: DrawKind::Sprite {
                    image: entry.image,
                    source: entry.source,
                },
                transform: info.place_sprite(document, size.y),
                tint: info.color,
            });
        }

        log::debug!(
            "tile layer '{}': {} sprites",
            self.info.name,
            self.batch.commands.len()
        );
        Ok(())
    }

    /// Cached sprites, in cell order
    pub fn commands(&self) -> &[DrawCommand] {
        &self.batch.commands
    }
}
