//! Hex color attributes and tint arithmetic.

use crate::error::{MapError, Result};
use macroquad::color::Color;

/// Parses `#RRGGBB` or `#AARRGGBB` (the leading `#` is optional).
///
/// Six-digit colors are fully opaque. `context` names the owner of the
/// attribute and ends up in the error.
pub fn parse_color(value: &str, context: &str) -> Result<Color> {
    let invalid = || MapError::InvalidColor {
        context: context.to_owned(),
        value: value.to_owned(),
    };

    let trimmed = value.trim();
    let s = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let byte = |i: usize| -> Result<f32> {
        u8::from_str_radix(&s[i..i + 2], 16)
            .map(|b| b as f32 / 255.0)
            .map_err(|_| invalid())
    };

    match s.len() {
        8 => Ok(Color::new(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
        6 => Ok(Color::new(byte(0)?, byte(2)?, byte(4)?, 1.0)),
        _ => Err(invalid()),
    }
}

/// Component-wise product of two multiplicative colors.
#[inline]
pub fn mul_color(a: Color, b: Color) -> Color {
    Color::new(a.r * b.r, a.g * b.g, a.b * b.b, a.a * b.a)
}
