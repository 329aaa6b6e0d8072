//! Scene composition options.

use crate::error::{MapError, Result};
use serde::Deserialize;

/// Vertical axis convention of the target coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxis {
    /// Origin top-left, y grows downwards (same as the document)
    #[default]
    Down,
    /// Origin bottom-left, y grows upwards
    Up,
}

/// What an object group does with a shape it cannot draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Skip the object, log a warning and keep the error in the diagnostics
    #[default]
    Report,
    /// Fail the layer's `update()`
    Fail,
}

/// Options shared by every compositor of one scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SceneOptions {
    /// Target axis convention
    #[serde(default)]
    pub y_axis: YAxis,
    /// Handling of undrawable object shapes
    #[serde(default)]
    pub unsupported_shapes: ShapePolicy,
}

impl SceneOptions {
    /// Reads options from JSON, e.g. `{"y_axis": "up"}`. Missing fields take
    /// their defaults, unknown ones are ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MapError::parse("scene options", e.to_string()))
    }
}
