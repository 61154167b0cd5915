//! Control tokenizer
//!
//! Splits a chunk into literal text and the control tokens of the supported
//! dialect. Unlike a byte-at-a-time VT parser this works on whole chunks: the
//! engine asks for the next token, inserts the literal prefix, applies the
//! token, and repeats on the remainder.
//!
//! Recognized CSI sequences follow the grammar
//!
//! ```text
//! ESC [ [?] [0-9;|*]* <letter other than m>
//! ```
//!
//! SGR (`m`) is left in the literal text for the color annotator. Any other
//! escape sequence also stays literal and is removed by [`strip_escapes`]
//! before the text reaches the buffer.

use std::borrow::Cow;

use super::token::{ControlToken, Direction, EraseMode};

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const SHIFT_IN: char = '\x0f';

/// UTF-8 en dash (E2 80 93) decoded one byte per char
const MOJIBAKE_EN_DASH: &str = "\u{e2}\u{80}\u{93}";

/// A token found in a chunk, with the text around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a> {
    /// Literal text before the token
    pub prefix: &'a str,
    pub token: ControlToken,
    /// Text after the token
    pub rest: &'a str,
}

/// Clean a chunk before tokenizing.
///
/// - NUL bytes are dropped, which also collapses the `ESC [ J` NUL padding
///   some programs send after a clear
/// - a mis-decoded en dash becomes `-`
/// - complete OSC strings and charset designators (`ESC ( X`, `ESC ) X`)
///   are removed
pub fn normalize(text: &str) -> Cow<'_, str> {
    if !text.contains(['\0', '\u{e2}', '\x1b']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find(['\0', '\u{e2}', '\x1b']) {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        rest = if let Some(after) = tail.strip_prefix('\0') {
            after
        } else if let Some(after) = tail.strip_prefix(MOJIBAKE_EN_DASH) {
            out.push('-');
            after
        } else if let Some(len) = removable_escape_len(tail.as_bytes()) {
            &tail[len..]
        } else {
            // Lone ESC or a lone U+00E2; keep the one char
            let c_len = tail.chars().next().map_or(1, char::len_utf8);
            out.push_str(&tail[..c_len]);
            &tail[c_len..]
        };
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Length of an OSC string or charset designator at the start of `bytes`
fn removable_escape_len(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&ESC) {
        return None;
    }
    match *bytes.get(1)? {
        b'(' | b')' => bytes.get(2).filter(|b| b.is_ascii_graphic()).map(|_| 3),
        b']' => string_end(bytes, 2),
        _ => None,
    }
}

/// Find the next control token.
///
/// `detached` selects the pattern set: while the cursor sits at the live end
/// of output a bare `\n` is ordinary text, once it has been moved away the
/// newline has to be interpreted as a cursor movement.
pub fn next_token(text: &str, detached: bool) -> Option<Match<'_>> {
    let bytes = text.as_bytes();
    for (i, &byte) in bytes.iter().enumerate() {
        let found = match byte {
            b'\r' => Some((1, ControlToken::CarriageReturn)),
            b'\n' if detached => Some((1, ControlToken::Newline)),
            ESC => parse_csi(&bytes[i..]),
            _ => None,
        };
        if let Some((len, token)) = found {
            return Some(Match {
                prefix: &text[..i],
                token,
                rest: &text[i + len..],
            });
        }
    }
    None
}

/// Parse a recognized CSI sequence at the start of `bytes`
fn parse_csi(bytes: &[u8]) -> Option<(usize, ControlToken)> {
    if bytes.get(1) != Some(&b'[') {
        return None;
    }
    let mut end = 2;
    if bytes.get(end) == Some(&b'?') {
        end += 1;
    }
    while bytes
        .get(end)
        .is_some_and(|&b| b.is_ascii_digit() || matches!(b, b';' | b'|' | b'*'))
    {
        end += 1;
    }

    let final_byte = *bytes.get(end)?;
    if !final_byte.is_ascii_alphabetic() || final_byte == b'm' {
        return None;
    }
    let params = std::str::from_utf8(&bytes[2..end]).ok()?;
    Some((end + 1, classify(params, final_byte as char)))
}

fn classify(params: &str, final_char: char) -> ControlToken {
    let unhandled = || ControlToken::Unhandled {
        params: params.to_string(),
        final_char,
    };

    match final_char {
        'A' | 'B' | 'C' | 'D' => {
            let dir = match final_char {
                'A' => Direction::Up,
                'B' => Direction::Down,
                'C' => Direction::Forward,
                _ => Direction::Backward,
            };
            match move_count(params) {
                Some(count) => ControlToken::CursorMove { dir, count },
                None => unhandled(),
            }
        }
        'H' => match coordinate(params) {
            Some((row, col)) => ControlToken::CursorCoordinate { row, col },
            None => unhandled(),
        },
        'K' => match params {
            "" | "0" => ControlToken::LineErase {
                mode: EraseMode::ToEnd,
            },
            "1" => ControlToken::LineErase {
                mode: EraseMode::ToStart,
            },
            "2" => ControlToken::LineErase {
                mode: EraseMode::Whole,
            },
            _ => unhandled(),
        },
        'J' => match params {
            "" | "0" => ControlToken::DisplayErase {
                mode: EraseMode::ToEnd,
            },
            "1" => ControlToken::DisplayErase {
                mode: EraseMode::ToStart,
            },
            "2" | "3" => ControlToken::DisplayErase {
                mode: EraseMode::Whole,
            },
            _ => unhandled(),
        },
        'h' | 'l' if params == "?2004" => ControlToken::BracketedPaste {
            enable: final_char == 'h',
        },
        _ => unhandled(),
    }
}

/// Count for a relative move. Missing or zero means one.
fn move_count(params: &str) -> Option<usize> {
    if params.is_empty() {
        return Some(1);
    }
    params.parse::<usize>().ok().map(|n| n.max(1))
}

/// `row;col` for CUP. Without a `;` the target is the origin; an empty side
/// defaults to zero.
fn coordinate(params: &str) -> Option<(usize, usize)> {
    fn number(s: &str) -> Option<usize> {
        if s.is_empty() {
            Some(0)
        } else {
            s.parse().ok()
        }
    }

    match params.split_once(';') {
        None => Some((0, 0)),
        Some((row, col)) => Some((number(row)?, number(col)?)),
    }
}

/// Remove every escape sequence from literal text.
///
/// Covers CSI (SGR included, along with a shift-in that closes it), OSC and
/// other string sequences, charset designators and two-byte `ESC X`
/// sequences. An unterminated sequence is dropped to the end of the text.
pub fn strip_escapes(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find('\x1b') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        let bytes = tail.as_bytes();
        let len = escape_len(bytes).unwrap_or(bytes.len());
        let after = &tail[len..];
        let is_sgr = len > 2 && bytes[1] == b'[' && bytes[len - 1] == b'm';
        rest = if is_sgr {
            after.strip_prefix(SHIFT_IN).unwrap_or(after)
        } else {
            after
        };
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Byte offset where an unfinished escape sequence at the end of `text`
/// begins, if there is one
pub fn incomplete_tail(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|&b| b == ESC) {
        let start = i + offset;
        match escape_len(&bytes[start..]) {
            Some(len) => i = start + len,
            None => return Some(start),
        }
    }
    None
}

/// Length of the complete escape sequence starting at `bytes[0]` (an ESC),
/// or `None` if the input ends before the sequence does
fn escape_len(bytes: &[u8]) -> Option<usize> {
    let second = *bytes.get(1)?;
    if !second.is_ascii() {
        return Some(1);
    }
    match second {
        b'[' => {
            let mut i = 2;
            while bytes.get(i).is_some_and(|b| (0x30..=0x3f).contains(b)) {
                i += 1;
            }
            while bytes.get(i).is_some_and(|b| (0x20..=0x2f).contains(b)) {
                i += 1;
            }
            match *bytes.get(i)? {
                0x40..=0x7e => Some(i + 1),
                // Malformed: end the sequence before the offending byte
                _ => Some(i),
            }
        }
        b']' | b'P' | b'X' | b'^' | b'_' => string_end(bytes, 2),
        b'(' | b')' | b'*' | b'+' => {
            let designator = *bytes.get(2)?;
            Some(if designator.is_ascii() { 3 } else { 2 })
        }
        _ => Some(2),
    }
}

/// End of a string sequence terminated by BEL or ST (`ESC \`)
fn string_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            BEL => return Some(i + 1),
            ESC if bytes.get(i + 1) == Some(&b'\\') => return Some(i + 2),
            _ => {},
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, detached: bool) -> Option<ControlToken> {
        next_token(text, detached).map(|m| m.token)
    }

    #[test]
    fn test_normalize_clear_padding() {
        assert_eq!(normalize("\x1b[J\0\0\0text"), "\x1b[Jtext");
        assert_eq!(normalize("a\0b"), "ab");
    }

    #[test]
    fn test_normalize_en_dash() {
        assert_eq!(normalize("10\u{e2}\u{80}\u{93}20"), "10-20");
        assert_eq!(normalize("caf\u{e2}"), "caf\u{e2}");
    }

    #[test]
    fn test_normalize_strips_osc_and_charset() {
        assert_eq!(normalize("\x1b]0;user@host: ~\x07$ "), "$ ");
        assert_eq!(normalize("\x1b]2;title\x1b\\ok"), "ok");
        assert_eq!(normalize("\x1b(Bplain\x1b)0"), "plain");
        assert_eq!(normalize("\x1b[1mbold"), "\x1b[1mbold");
    }

    #[test]
    fn test_normalize_borrows_clean_text() {
        assert!(matches!(normalize("plain text\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_carriage_return_token() {
        let m = next_token("abc\rXYZ", false).unwrap();
        assert_eq!(m.prefix, "abc");
        assert_eq!(m.token, ControlToken::CarriageReturn);
        assert_eq!(m.rest, "XYZ");
    }

    #[test]
    fn test_newline_only_when_detached() {
        assert_eq!(token("a\nb", false), None);
        let m = next_token("a\nb", true).unwrap();
        assert_eq!(m.prefix, "a");
        assert_eq!(m.token, ControlToken::Newline);
        assert_eq!(m.rest, "b");
    }

    #[test]
    fn test_cursor_moves() {
        assert_eq!(
            token("\x1b[3A", false),
            Some(ControlToken::CursorMove {
                dir: Direction::Up,
                count: 3
            })
        );
        assert_eq!(
            token("\x1b[B", false),
            Some(ControlToken::CursorMove {
                dir: Direction::Down,
                count: 1
            })
        );
        assert_eq!(
            token("\x1b[0C", false),
            Some(ControlToken::CursorMove {
                dir: Direction::Forward,
                count: 1
            })
        );
        assert_eq!(
            token("\x1b[12D", false),
            Some(ControlToken::CursorMove {
                dir: Direction::Backward,
                count: 12
            })
        );
    }

    #[test]
    fn test_coordinate() {
        assert_eq!(
            token("\x1b[10;4H", false),
            Some(ControlToken::CursorCoordinate { row: 10, col: 4 })
        );
        assert_eq!(
            token("\x1b[H", false),
            Some(ControlToken::CursorCoordinate { row: 0, col: 0 })
        );
        assert_eq!(
            token("\x1b[;7H", false),
            Some(ControlToken::CursorCoordinate { row: 0, col: 7 })
        );
        assert!(matches!(
            token("\x1b[1;2;3H", false),
            Some(ControlToken::Unhandled { .. })
        ));
    }

    #[test]
    fn test_erase_modes() {
        assert_eq!(
            token("\x1b[K", false),
            Some(ControlToken::LineErase {
                mode: EraseMode::ToEnd
            })
        );
        assert_eq!(
            token("\x1b[1K", false),
            Some(ControlToken::LineErase {
                mode: EraseMode::ToStart
            })
        );
        assert_eq!(
            token("\x1b[2K", false),
            Some(ControlToken::LineErase {
                mode: EraseMode::Whole
            })
        );
        assert_eq!(
            token("\x1b[J", false),
            Some(ControlToken::DisplayErase {
                mode: EraseMode::ToEnd
            })
        );
        assert_eq!(
            token("\x1b[1J", false),
            Some(ControlToken::DisplayErase {
                mode: EraseMode::ToStart
            })
        );
        assert_eq!(
            token("\x1b[3J", false),
            Some(ControlToken::DisplayErase {
                mode: EraseMode::Whole
            })
        );
        assert!(matches!(
            token("\x1b[3K", false),
            Some(ControlToken::Unhandled { .. })
        ));
    }

    #[test]
    fn test_bracketed_paste() {
        assert_eq!(
            token("\x1b[?2004h", false),
            Some(ControlToken::BracketedPaste { enable: true })
        );
        assert_eq!(
            token("\x1b[?2004l", false),
            Some(ControlToken::BracketedPaste { enable: false })
        );
    }

    #[test]
    fn test_private_mode_consumed() {
        let m = next_token("x\x1b[?25ly", false).unwrap();
        assert_eq!(m.prefix, "x");
        assert_eq!(
            m.token,
            ControlToken::Unhandled {
                params: "?25".to_string(),
                final_char: 'l'
            }
        );
        assert_eq!(m.rest, "y");
    }

    #[test]
    fn test_sgr_left_as_text() {
        assert_eq!(token("\x1b[1;31mred", false), None);
        let m = next_token("\x1b[0m\x1b[2K", false).unwrap();
        assert_eq!(m.prefix, "\x1b[0m");
    }

    #[test]
    fn test_leftmost_match_wins() {
        let m = next_token("a\x1b[Kb\rc", false).unwrap();
        assert_eq!(m.prefix, "a");
        assert_eq!(m.rest, "b\rc");
    }

    #[test]
    fn test_non_ascii_prefix() {
        let m = next_token("héllo\r", false).unwrap();
        assert_eq!(m.prefix, "héllo");
        assert_eq!(m.rest, "");
    }

    #[test]
    fn test_strip_escapes() {
        assert_eq!(strip_escapes("plain"), "plain");
        assert_eq!(strip_escapes("\x1b[1mbold\x1b[0m"), "bold");
        assert_eq!(strip_escapes("\x1b[m\x0f3"), "3");
        assert_eq!(strip_escapes("a\x1b[>0cb"), "ab");
        assert_eq!(strip_escapes("a\x1b=b\x1b>c"), "abc");
        assert_eq!(strip_escapes("\x1b]0;t\x07x"), "x");
        assert_eq!(strip_escapes("cut\x1b[38;5"), "cut");
    }

    #[test]
    fn test_incomplete_tail() {
        assert_eq!(incomplete_tail("done"), None);
        assert_eq!(incomplete_tail("done\x1b[1m"), None);
        assert_eq!(incomplete_tail("abc\x1b"), Some(3));
        assert_eq!(incomplete_tail("abc\x1b[12;3"), Some(3));
        assert_eq!(incomplete_tail("\x1b[1mok\x1b]0;title"), Some(6));
        assert_eq!(incomplete_tail("\x1b(B"), None);
        assert_eq!(incomplete_tail("\x1b("), Some(0));
    }
}
