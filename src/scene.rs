//! Entry point: a whole map as one compositor tree.

use crate::compositor::{Compositor, GroupCompositor, SceneContext};
use crate::config::SceneOptions;
use crate::error::Result;
use crate::layer_info::LayerInfo;
use crate::map::Map;
use crate::tileset::Resources;

/// Builds the root group spanning the map (no offset, opaque white) and
/// every layer beneath it.
///
/// Fails on the first layer that cannot be composed; no partial tree is
/// returned.
pub fn build_root<'m>(
    map: &'m Map,
    resources: &'m Resources,
    options: SceneOptions,
) -> Result<Compositor<'m>> {
    let ctx = SceneContext {
        resources,
        options,
    };
    let info = LayerInfo::root(map, options.y_axis);
    let root = GroupCompositor::new(&map.layers, info, ctx)?;
    log::debug!(
        "built scene: {} root layers, {} commands",
        map.layers.len(),
        root.children().iter().map(Compositor::len).sum::<usize>()
    );
    Ok(Compositor::Group(root))
}
