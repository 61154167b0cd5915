//! xterm 256-color palette
//!
//! - 0-15: standard and bright colors (typical xterm defaults)
//! - 16-231: 6x6x6 color cube
//! - 232-255: 24-step grayscale ramp

use super::Color;

/// Number of entries in the palette
pub const NUM_COLORS: usize = 256;

const ANSI: [u32; 16] = [
    0x000000, // Black
    0xcd0000, // Red
    0x00cd00, // Green
    0xcdcd00, // Yellow
    0x0000ee, // Blue
    0xcd00cd, // Magenta
    0x00cdcd, // Cyan
    0xe5e5e5, // White
    0x7f7f7f, // Bright Black
    0xff0000, // Bright Red
    0x00ff00, // Bright Green
    0xffff00, // Bright Yellow
    0x5c5cff, // Bright Blue
    0xff00ff, // Bright Magenta
    0x00ffff, // Bright Cyan
    0xffffff, // Bright White
];

const fn cube_level(v: u8) -> u8 {
    if v == 0 {
        0
    } else {
        55 + v * 40
    }
}

const fn build() -> [Color; NUM_COLORS] {
    let mut colors = [Color::new(0, 0, 0); NUM_COLORS];

    let mut i = 0;
    while i < 16 {
        colors[i] = Color::from_hex(ANSI[i]);
        i += 1;
    }

    while i < 232 {
        let n = (i - 16) as u8;
        colors[i] = Color::new(cube_level(n / 36), cube_level((n % 36) / 6), cube_level(n % 6));
        i += 1;
    }

    while i < NUM_COLORS {
        let gray = 8 + (i - 232) as u8 * 10;
        colors[i] = Color::new(gray, gray, gray);
        i += 1;
    }

    colors
}

static PALETTE: [Color; NUM_COLORS] = build();

/// Look up a palette index. Indices outside 0-255 have no color.
pub fn lookup(index: usize) -> Option<Color> {
    PALETTE.get(index).copied()
}

/// Look up one of the eight standard colors, optionally in its bright variant
pub fn ansi(n: u8, bright: bool) -> Option<Color> {
    let index = if bright && n < 8 { n + 8 } else { n };
    if index < 16 {
        lookup(index as usize)
    } else {
        None
    }
}
