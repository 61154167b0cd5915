//! Text style
//!
//! The style that SGR sequences accumulate and that styled sections carry to
//! the buffer. Unlike a grid terminal there is no per-cell attribute storage:
//! a style is attached to a whole run of inserted text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 24-bit RGB color, rendered as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed `0xRRGGBB` value
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error returned when a string is not a `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color: {0:?}")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        u32::from_str_radix(hex, 16)
            .map(Color::from_hex)
            .map_err(|_| ParseColorError(s.to_string()))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Accumulated text style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl Style {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Key under which regions of this style are grouped.
    ///
    /// Only the colors take part: two runs that differ in bold or italic but
    /// share fg/bg end up in the same scope.
    pub fn scope_key(&self) -> String {
        fn part(color: Option<Color>) -> String {
            color.map_or_else(|| "None".to_string(), |c| c.to_string())
        }
        format!("{}{}", part(self.fg), part(self.bg))
    }
}
