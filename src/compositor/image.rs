use super::{Batch, SceneContext};
use crate::command::{DrawCommand, DrawKind, DrawOrigin};
use crate::error::{MapError, Result};
use crate::layer_info::LayerInfo;
use crate::map::ImageRef;
use macroquad::math::{Affine2, Rect};

/// Image layer: the whole image at the layer offset.
#[derive(Debug)]
pub struct ImageCompositor<'m> {
    image: Option<&'m ImageRef>,
    pub(crate) info: LayerInfo,
    ctx: SceneContext<'m>,
    pub(crate) batch: Batch,
}

impl<'m> ImageCompositor<'m> {
    pub(crate) fn new(image: Option<&'m ImageRef>, info: LayerInfo, ctx: SceneContext<'m>) -> Result<Self> {
        let mut c = ImageCompositor {
            image,
            info,
            ctx,
            batch: Batch::default(),
        };
        c.update()?;
        Ok(c)
    }

    /// Looks the image up again.
    pub fn update(&mut self) -> Result<()> {
        self.batch.clear();
        let missing = || MapError::MissingImageSource {
            layer: self.info.name.clone(),
        };

        let image = self.image.filter(|i| !i.source.is_empty()).ok_or_else(missing)?;
        let handle = self.ctx.resources.handle_for(&image.source).ok_or_else(missing)?;
        let decoded = self.ctx.resources.image(handle);
        let source = Rect::new(0.0, 0.0, decoded.width() as f32, decoded.height() as f32);

        let command = DrawCommand {
            origin: DrawOrigin::Image {
                layer: self.info.name.clone(),
            },
            kind: DrawKind::Sprite { image: handle, source },
            transform: self
                .info
                .place_sprite(Affine2::from_translation(self.info.offset), source.h),
            tint: self.info.color,
        };
        self.batch.push(command);
        Ok(())
    }
}
