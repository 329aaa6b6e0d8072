//! In-memory TMX document: map metadata, tile sets, the layer tree and objects.
//!
//! The model only stores what the file says. Defaults that depend on the
//! parent layer (size, offset, opacity, tint) are left as `Option`s and
//! resolved by [`LayerInfo`](crate::LayerInfo) during composition.

use crate::error::Result;
use crate::gid::TileInstance;
use crate::loader::tmx_loader;
use crate::properties::Properties;
use macroquad::color::{Color, BLACK};
use macroquad::math::Vec2;
use std::ops::Range;
use std::path::Path;

/// Root of a TMX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    /// Format version as written
    pub version: String,
    /// Only `orthogonal` maps are composed correctly
    pub orientation: String,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Cell width in pixels
    pub tile_width: u32,
    /// Cell height in pixels
    pub tile_height: u32,
    /// `backgroundcolor`, if set
    pub background_color: Option<Color>,
    /// Custom properties
    pub properties: Properties,
    /// Ordered by `first_gid`
    pub tilesets: Vec<TileSet>,
    /// Layer tree roots, in draw order
    pub layers: Vec<Layer>,
}

impl Map {
    /// Reads a `.tmx` file and merges the external tile sets it references.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        tmx_loader::load_map_file(path.as_ref())
    }

    /// Parses a document and resolves external tile sets relative to `base_dir`.
    pub fn load_from_str(xml: &str, base_dir: impl AsRef<Path>) -> Result<Self> {
        tmx_loader::load_map_str(xml, Some(base_dir.as_ref()))
    }

    /// Parses a document without touching the file system. External tile set
    /// references are kept as-is (see [`TileSet::source`]).
    pub fn parse_str(xml: &str) -> Result<Self> {
        tmx_loader::load_map_str(xml, None)
    }

    /// Map width in pixels
    pub fn pixel_width(&self) -> u32 {
        self.width.saturating_mul(self.tile_width)
    }

    /// Map height in pixels
    pub fn pixel_height(&self) -> u32 {
        self.height.saturating_mul(self.tile_height)
    }

    /// Depth-first walk over every layer, groups before their children.
    pub fn layers_recursive(&self) -> Vec<&Layer> {
        fn walk<'a>(layers: &'a [Layer], out: &mut Vec<&'a Layer>) {
            for l in layers {
                out.push(l);
                if let LayerKind::Group(children) = &l.kind {
                    walk(children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.layers, &mut out);
        out
    }
}

/// A tile set claiming the contiguous gid range starting at `first_gid`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileSet {
    /// Gid of local tile 0
    pub first_gid: u32,
    /// Path of the external `.tsx` this entry was (or should be) merged from
    pub source: Option<String>,
    /// Display name
    pub name: String,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Pixels between neighbouring tiles in the atlas
    pub spacing: u32,
    /// Pixels around the atlas border
    pub margin: u32,
    /// Number of tiles
    pub tile_count: u32,
    /// Atlas columns; derived from the image width when 0
    pub columns: u32,
    /// Drawing offset applied to every tile of this set
    pub tile_offset: Vec2,
    /// Atlas image; `None` for image-collection tile sets
    pub image: Option<ImageRef>,
    /// Per-tile metadata (and per-tile images for collections)
    pub tiles: Vec<TileDef>,
    /// Custom properties
    pub properties: Properties,
}

impl TileSet {
    /// Global ids owned by this set
    pub fn gid_range(&self) -> Range<u32> {
        self.first_gid..self.first_gid.saturating_add(self.tile_count)
    }

    /// True when the set still points at an unmerged `.tsx`
    pub fn is_unresolved(&self) -> bool {
        self.source.is_some() && self.tile_count == 0 && self.image.is_none() && self.tiles.is_empty()
    }
}

/// Reference to an image file, relative to the map directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRef {
    /// Path as written (rebased for merged tile sets)
    pub source: String,
    /// Declared width; the decoded image wins
    pub width: Option<u32>,
    /// Declared height; the decoded image wins
    pub height: Option<u32>,
}

/// Metadata of one tile inside a tile set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileDef {
    /// Local id within the set
    pub id: u32,
    /// `class` (or legacy `type`)
    pub class: Option<String>,
    /// Own image, for image-collection tile sets
    pub image: Option<ImageRef>,
    /// Custom properties
    pub properties: Properties,
}

/// One node of the layer tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Editor id
    pub id: Option<u32>,
    /// Layer name, used in error messages
    pub name: String,
    /// Grid width in cells; inherits from the parent when absent
    pub width: Option<u32>,
    /// Grid height in cells; inherits from the parent when absent
    pub height: Option<u32>,
    /// Pixel offset relative to the parent
    pub offset: Vec2,
    /// Own opacity in `0..=1`
    pub opacity: Option<f32>,
    /// `visible="0"` hides the layer and everything below it
    pub visible: Option<bool>,
    /// Tint as written in the file (`#RRGGBB` / `#AARRGGBB`)
    pub tint: Option<String>,
    /// Custom properties
    pub properties: Properties,
    /// Kind-specific payload
    pub kind: LayerKind,
}

impl Layer {
    /// A layer with every optional attribute unset.
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Layer {
            id: None,
            name: name.into(),
            width: None,
            height: None,
            offset: Vec2::ZERO,
            opacity: None,
            visible: None,
            tint: None,
            properties: Properties::new(),
            kind,
        }
    }
}

/// Kind-specific payload of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// `<layer>`
    Tiles(TileData),
    /// `<objectgroup>`
    Objects(ObjectGroup),
    /// `<imagelayer>`; the image may be missing in the file
    Image(Option<ImageRef>),
    /// `<group>`
    Group(Vec<Layer>),
    /// Any other element found where a layer was expected
    Unsupported(String),
}

impl LayerKind {
    /// Element name of this kind
    pub fn name(&self) -> &str {
        match self {
            LayerKind::Tiles(_) => "layer",
            LayerKind::Objects(_) => "objectgroup",
            LayerKind::Image(_) => "imagelayer",
            LayerKind::Group(_) => "group",
            LayerKind::Unsupported(kind) => kind,
        }
    }
}

/// Raw `<data>` payload of a tile layer, decoded lazily by
/// [`TileData::tiles`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileData {
    /// `csv`, `base64` or none
    pub encoding: Option<String>,
    /// `gzip`, `zlib` or none
    pub compression: Option<String>,
    /// Text content for `csv` / `base64`
    pub payload: String,
    /// `<tile gid=".."/>` records when no encoding is set
    pub records: Vec<u32>,
}

impl TileData {
    /// Pre-parsed records (no encoding)
    pub fn from_records(records: Vec<u32>) -> Self {
        TileData {
            records,
            ..Default::default()
        }
    }

    /// Comma separated decimal text
    pub fn csv(payload: impl Into<String>) -> Self {
        TileData {
            encoding: Some("csv".into()),
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Base64 text, optionally `gzip` / `zlib` compressed
    pub fn base64(payload: impl Into<String>, compression: Option<&str>) -> Self {
        TileData {
            encoding: Some("base64".into()),
            compression: compression.map(str::to_owned),
            payload: payload.into(),
            records: Vec::new(),
        }
    }
}

/// Object ordering inside an object group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawOrder {
    /// Sorted by y, ties keep file order
    #[default]
    TopDown,
    /// File order
    Index,
}

/// Payload of an `<objectgroup>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectGroup {
    /// `draworder`
    pub draw_order: DrawOrder,
    /// Objects in file order
    pub objects: Vec<Object>,
}

/// A free-form object. Coordinates are pixels, origin top-left, y down.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Unique within the map
    pub id: u32,
    /// Object name
    pub name: String,
    /// `class` (or legacy `type`)
    pub class: String,
    /// Position x in pixels
    pub x: f32,
    /// Position y in pixels
    pub y: f32,
    /// Width in pixels
    pub width: Option<f32>,
    /// Height in pixels
    pub height: Option<f32>,
    /// Degrees, clockwise
    pub rotation: Option<f32>,
    /// Makes this a tile object
    pub gid: Option<TileInstance>,
    /// `visible="0"` objects are never drawn
    pub visible: bool,
    /// Geometry; ignored for tile objects
    pub shape: ObjectShape,
    /// Custom properties
    pub properties: Properties,
}

impl Object {
    /// A visible rectangle object at `(x, y)` with no size.
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Object {
            id,
            name: String::new(),
            class: String::new(),
            x,
            y,
            width: None,
            height: None,
            rotation: None,
            gid: None,
            visible: true,
            shape: ObjectShape::Rectangle,
            properties: Properties::new(),
        }
    }

    /// Declared size, when both dimensions are set
    pub fn size(&self) -> Option<Vec2> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Vec2::new(w, h)),
            _ => None,
        }
    }
}

/// Geometry of an object. Points are relative to the object position.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// No shape element
    Rectangle,
    /// `<ellipse/>`
    Ellipse,
    /// `<point/>`
    Point,
    /// `<polygon points=".."/>`
    Polygon(Vec<Vec2>),
    /// `<polyline points=".."/>`
    Polyline(Vec<Vec2>),
    /// `<text>`
    Text(TextShape),
    /// A shape element this crate does not know how to draw
    Unrecognized(String),
}

impl ObjectShape {
    /// Element name of this shape
    pub fn name(&self) -> &str {
        match self {
            ObjectShape::Rectangle => "rectangle",
            ObjectShape::Ellipse => "ellipse",
            ObjectShape::Point => "point",
            ObjectShape::Polygon(_) => "polygon",
            ObjectShape::Polyline(_) => "polyline",
            ObjectShape::Text(_) => "text",
            ObjectShape::Unrecognized(name) => name,
        }
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum VAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// `<text>` object payload.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct TextShape {
    pub text: String,
    pub font_family: String,
    pub pixel_size: u32,
    pub wrap: bool,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub halign: HAlign,
    pub valign: VAlign,
}

impl Default for TextShape {
    fn default() -> Self {
        TextShape {
            text: String::new(),
            font_family: "sans-serif".into(),
            pixel_size: 16,
            wrap: false,
            color: BLACK,
            bold: false,
            italic: false,
            halign: HAlign::Left,
            valign: VAlign::Top,
        }
    }
}
