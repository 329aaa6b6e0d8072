use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while loading a map or composing its layers.
#[derive(Debug, Error)]
pub enum MapError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Malformed document structure (XML syntax, bad attribute, broken invariant)
    #[error("parse error in {context}: {message}")]
    Parse {
        /// Where the failure happened (element or file)
        context: String,
        /// What went wrong
        message: String,
    },

    /// Bad encoding/compression combination or unreadable tile stream
    #[error("invalid tile data in layer '{layer}': {reason}")]
    InvalidLayerData {
        /// Layer name
        layer: String,
        /// Decoder message
        reason: String,
    },

    /// Tile set geometry exceeds its source image
    #[error("tile set '{tileset}': tiles {tiles:?} fall outside the {image_width}x{image_height} image")]
    TileOutOfBounds {
        /// Tile set name
        tileset: String,
        /// Every offending local tile id
        tiles: Vec<u32>,
        /// Decoded image width
        image_width: u32,
        /// Decoded image height
        image_height: u32,
    },

    /// A non-empty GID without a tile set entry
    #[error("unknown tile gid {gid} at {location} in layer '{layer}'")]
    UnknownTile {
        /// Layer name
        layer: String,
        /// Cell index or object id
        location: TileLocation,
        /// The cleaned global id
        gid: u32,
    },

    /// Cell index past the grid capacity
    #[error("cell {cell} out of range in layer '{layer}' (capacity {capacity})")]
    CellOutOfRange {
        /// Layer name
        layer: String,
        /// Requested cell
        cell: u32,
        /// `width * height`
        capacity: u32,
    },

    /// Malformed `#RRGGBB` / `#AARRGGBB` string
    #[error("invalid color '{value}' in {context}")]
    InvalidColor {
        /// Owner of the color attribute
        context: String,
        /// Raw attribute value
        value: String,
    },

    /// Image layer without an `<image>`
    #[error("image layer '{layer}' has no image source")]
    MissingImageSource {
        /// Layer name
        layer: String,
    },

    /// Layer element the scene builder does not know
    #[error("unsupported layer kind '{kind}'")]
    UnsupportedLayerKind {
        /// Element name
        kind: String,
    },

    /// Object shape the object compositor cannot draw
    #[error("unsupported shape '{shape}' on object {object_id} in layer '{layer}'")]
    UnsupportedShape {
        /// Layer name
        layer: String,
        /// Object id
        object_id: u32,
        /// Shape element name
        shape: String,
    },

    /// Image bytes could not be decoded
    #[error("could not decode image {path}: {reason}")]
    ImageDecode {
        /// Image path
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Two tile sets claim the same global ids
    #[error("tile sets '{first}' and '{second}' have overlapping gid ranges")]
    OverlappingTileSets {
        /// Tile set with the lower first gid
        first: String,
        /// Tile set starting inside the first one's range
        second: String,
    },
}

/// Where a tile reference was found, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLocation {
    /// Row-major cell index in a tile layer
    Cell(u32),
    /// Object id in an object group
    Object(u32),
}

impl std::fmt::Display for TileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileLocation::Cell(i) => write!(f, "cell {i}"),
            TileLocation::Object(id) => write!(f, "object {id}"),
        }
    }
}

impl MapError {
    pub(crate) fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        MapError::Parse {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MapError>;
