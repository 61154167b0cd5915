//! SGR decoder
//!
//! Decodes the parameter list of one `ESC [ ... m` body into an update of
//! the live style. The decoder is stateless: brightness of the standard
//! colors follows a bold set earlier in the *same* body, not the live style.

use tracing::debug;

use crate::core::{palette, Color, Style};

/// Changes one SGR body makes to the live style. `None` leaves a field as it
/// is; a reset sets every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SgrUpdate {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub fg: Option<Option<Color>>,
    pub bg: Option<Option<Color>>,
}

impl SgrUpdate {
    fn reset() -> Self {
        let default = Style::default();
        Self {
            bold: Some(default.bold),
            italic: Some(default.italic),
            underline: Some(default.underline),
            fg: Some(default.fg),
            bg: Some(default.bg),
        }
    }

    /// Apply to the live style
    pub fn apply(&self, style: &mut Style) {
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underline) = self.underline {
            style.underline = underline;
        }
        if let Some(fg) = self.fg {
            style.fg = fg;
        }
        if let Some(bg) = self.bg {
            style.bg = bg;
        }
    }
}

/// Bodies with no rendering of their own (faint, blink, hidden, strike),
/// optionally after a reset. They are shown as bold.
pub fn is_unsupported(body: &str) -> bool {
    let code = body.strip_prefix("0;").unwrap_or(body);
    matches!(code, "2" | "5" | "6" | "8" | "9")
}

/// Decode one SGR body (the text between `ESC [` and `m`).
///
/// Returns `None` when no parameter was recognized, so the caller can leave
/// the live style untouched.
pub fn decode(body: &str) -> Option<SgrUpdate> {
    let body = if is_unsupported(body) { "1" } else { body };
    let params: Vec<&str> = body.split(';').collect();

    let mut update = SgrUpdate::default();
    let mut changed = false;
    let mut i = 0;
    while i < params.len() {
        let param = params[i];
        i += 1;

        let code = if param.is_empty() {
            0
        } else {
            match param.parse::<u16>() {
                Ok(code) => code,
                Err(_) => {
                    debug!(param, "ignoring malformed SGR parameter");
                    continue;
                }
            }
        };
        let bright = update.bold.unwrap_or(false);

        match code {
            0 => update = SgrUpdate::reset(),
            1 => update.bold = Some(true),
            3 => update.italic = Some(true),
            4 => update.underline = Some(true),
            // Reverse video, approximated with fixed colors
            7 => {
                update.fg = Some(palette::ansi(0, bright));
                update.bg = Some(palette::ansi(7, bright));
            }
            30..=37 => update.fg = Some(palette::ansi((code - 30) as u8, bright)),
            40..=47 => update.bg = Some(palette::ansi((code - 40) as u8, bright)),
            90..=97 => update.fg = Some(palette::ansi((code - 90) as u8, true)),
            100..=107 => update.bg = Some(palette::ansi((code - 100) as u8, true)),
            38 | 48 => {
                let (consumed, color) = extended_color(&params[i..]);
                i += consumed;
                let Some(color) = color else {
                    debug!(body, "no color decoded from extended color");
                    continue;
                };
                if code == 38 {
                    update.fg = Some(Some(color));
                } else {
                    update.bg = Some(Some(color));
                }
            }
            _ => {
                debug!(code, "ignoring unsupported SGR code");
                continue;
            }
        }
        changed = true;
    }

    changed.then_some(update)
}

/// Decode the parameters after a 38/48.
///
/// Returns how many parameters were consumed. A list too short for its form
/// consumes the rest and yields no color.
fn extended_color(rest: &[&str]) -> (usize, Option<Color>) {
    match rest.first().copied() {
        Some("5") => match rest.get(1) {
            Some(index) => (2, index.parse::<usize>().ok().and_then(palette::lookup)),
            None => (rest.len(), None),
        },
        Some("2") => {
            if rest.len() < 4 {
                return (rest.len(), None);
            }
            let channel = |i: usize| rest[i].parse::<u8>().ok();
            let color = match (channel(1), channel(2), channel(3)) {
                (Some(r), Some(g), Some(b)) => Some(Color::new(r, g, b)),
                _ => None,
            };
            (4, color)
        }
        _ => (0, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(body: &str, base: Style) -> Style {
        let mut style = base;
        if let Some(update) = decode(body) {
            update.apply(&mut style);
        }
        style
    }

    fn hex(value: u32) -> Option<Color> {
        Some(Color::from_hex(value))
    }

    #[test]
    fn test_reset() {
        let styled = Style {
            bold: true,
            underline: true,
            fg: hex(0xcd0000),
            ..Default::default()
        };
        assert_eq!(decoded("0", styled), Style::default());
        assert_eq!(decoded("", styled), Style::default());
        assert_eq!(decoded("00", styled), Style::default());
    }

    #[test]
    fn test_attributes() {
        let style = decoded("1;3;4", Style::default());
        assert!(style.bold && style.italic && style.underline);
    }

    #[test]
    fn test_standard_colors() {
        assert_eq!(decoded("31", Style::default()).fg, hex(0xcd0000));
        assert_eq!(decoded("44", Style::default()).bg, hex(0x0000ee));
        assert_eq!(decoded("92", Style::default()).fg, hex(0x00ff00));
        assert_eq!(decoded("107", Style::default()).bg, hex(0xffffff));
    }

    #[test]
    fn test_bold_brightens_within_body() {
        assert_eq!(decoded("1;31", Style::default()).fg, hex(0xff0000));
        // Bold from an earlier body does not count
        let bold = Style {
            bold: true,
            ..Default::default()
        };
        assert_eq!(decoded("31", bold).fg, hex(0xcd0000));
        assert!(decoded("31", bold).bold);
    }

    #[test]
    fn test_reverse_video() {
        let style = decoded("7", Style::default());
        assert_eq!(style.fg, hex(0x000000));
        assert_eq!(style.bg, hex(0xe5e5e5));
        let style = decoded("1;7", Style::default());
        assert_eq!(style.fg, hex(0x7f7f7f));
        assert_eq!(style.bg, hex(0xffffff));
    }

    #[test]
    fn test_palette_background_after_reset() {
        let base = Style {
            bold: true,
            italic: true,
            fg: hex(0x00cd00),
            ..Default::default()
        };
        let style = decoded("0;48;5;202", base);
        assert_eq!(
            style,
            Style {
                bg: hex(0xff5f00),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_truecolor() {
        assert_eq!(decoded("38;2;255;95;0", Style::default()).fg, hex(0xff5f00));
        assert_eq!(decoded("48;2;1;2;3", Style::default()).bg, hex(0x010203));
    }

    #[test]
    fn test_trailing_zero_after_extended_color() {
        let style = decoded("1;38;5;202;0;4", Style::default());
        assert_eq!(
            style,
            Style {
                underline: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_truncated_extended_color() {
        assert_eq!(decode("38;5"), None);
        assert_eq!(decode("48;2;10;20"), None);
        let style = decoded("1;38;2;10", Style::default());
        assert!(style.bold);
        assert_eq!(style.fg, None);
    }

    #[test]
    fn test_palette_index_out_of_range() {
        assert_eq!(decode("38;5;256"), None);
        assert_eq!(decode("38;2;300;0;0"), None);
    }

    #[test]
    fn test_unsupported_bodies_become_bold() {
        for body in ["2", "5", "6", "8", "9", "0;5"] {
            assert!(is_unsupported(body), "{body}");
            assert!(decoded(body, Style::default()).bold, "{body}");
        }
        assert!(!is_unsupported("1;5"));
    }

    #[test]
    fn test_unknown_codes_ignored() {
        assert_eq!(decode("22"), None);
        assert_eq!(decode("x"), None);
        assert_eq!(decode("38"), None);
        let italic = Style {
            italic: true,
            ..Default::default()
        };
        assert_eq!(decoded("24;39", italic), italic);
    }
}
