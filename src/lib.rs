#![warn(missing_docs)]

//! Tiled TMX loader that composes a map's layer tree into draw commands,
//! with a Macroquad backend.
//!
//! ```no_run
//! use tmx_compose::{build_root, FsImageSource, Map, Resources, SceneOptions};
//!
//! # fn main() -> tmx_compose::Result<()> {
//! let map = Map::load_from_file("assets/level.tmx")?;
//! let resources = Resources::load(&map, "assets", &FsImageSource)?;
//! let scene = build_root(&map, &resources, SceneOptions::default())?;
//!
//! let mut commands = Vec::new();
//! scene.draw(&mut commands);
//! # Ok(())
//! # }
//! ```

mod color;
mod command;
pub mod compositor;
mod config;
mod error;
pub mod gid;
mod grid;
mod layer_info;
mod loader {
    pub(crate) mod tmx_loader;
    pub(crate) mod xml;
}
mod map;
mod properties;
pub mod render;
mod scene;
mod tileset;

pub use color::{mul_color, parse_color};
pub use command::{DrawCommand, DrawKind, DrawOrigin, RenderTarget, Shape};
pub use compositor::{Compositor, SceneContext};
pub use config::{SceneOptions, ShapePolicy, YAxis};
pub use error::{MapError, Result, TileLocation};
pub use gid::{DecodedGid, TileInstance};
pub use grid::{GridCell, TileIter};
pub use layer_info::{compose, LayerInfo, LayerLocal};
pub use map::{
    DrawOrder, HAlign, ImageRef, Layer, LayerKind, Map, Object, ObjectGroup, ObjectShape,
    TextShape, TileData, TileDef, TileSet, VAlign,
};
pub use properties::{Properties, PropertyValue};
pub use scene::build_root;
pub use tileset::{FsImageSource, ImageHandle, ImageSource, Resources, TileSetEntry};
