use super::{Compositor, SceneContext};
use crate::command::{union, RenderTarget};
use crate::error::Result;
use crate::layer_info::LayerInfo;
use crate::map::Layer;
use macroquad::math::Rect;

/// Group layer: children drawn in document order.
#[derive(Debug)]
pub struct GroupCompositor<'m> {
    pub(crate) info: LayerInfo,
    pub(crate) children: Vec<Compositor<'m>>,
}

impl<'m> GroupCompositor<'m> {
    /// Builds every child; the first failing child fails the whole group.
    pub(crate) fn new(layers: &'m [Layer], info: LayerInfo, ctx: SceneContext<'m>) -> Result<Self> {
        let children = layers
            .iter()
            .map(|layer| Compositor::new(layer, &info, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupCompositor { info, children })
    }

    /// Updates every child in order, stopping at the first error.
    pub fn update(&mut self) -> Result<()> {
        self.children.iter_mut().try_for_each(Compositor::update)
    }

    pub(crate) fn draw(&self, target: &mut dyn RenderTarget, view: Option<Rect>) {
        for child in &self.children {
            match view {
                Some(view) => child.draw_visible(target, view),
                None => child.draw(target),
            }
        }
    }

    /// Union of the children's bounds
    pub fn bounds(&self) -> Option<Rect> {
        self.children
            .iter()
            .filter_map(Compositor::bounds)
            .fold(None, |acc, b| Some(union(acc, b)))
    }

    /// Child compositors, in draw order
    pub fn children(&self) -> &[Compositor<'m>] {
        &self.children
    }
}
