//! Control tokens produced by the tokenizer
//!
//! These are the semantic meaning of the control sequences the engine acts
//! on. Anything else in the stream is literal text (or an SGR run, which the
//! color annotator handles on its own).

use serde::{Deserialize, Serialize};

/// Direction of a relative cursor move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// CUU - `ESC [ n A`
    Up,
    /// CUD - `ESC [ n B`
    Down,
    /// CUF - `ESC [ n C`
    Forward,
    /// CUB - `ESC [ n D`
    Backward,
}

/// Extent of an erase, shared by EL and ED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraseMode {
    /// Cursor through end (`0` or no parameter)
    ToEnd,
    /// Start through cursor (`1`)
    ToStart,
    /// Everything (`2`, and `3` for ED)
    Whole,
}

/// A control token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlToken {
    /// Bare `\n`, only tokenized while the cursor is detached
    Newline,

    /// `\r`
    CarriageReturn,

    /// CUU/CUD/CUF/CUB
    CursorMove { dir: Direction, count: usize },

    /// CUP - `ESC [ row ; col H`
    CursorCoordinate { row: usize, col: usize },

    /// EL - `ESC [ n K`
    LineErase { mode: EraseMode },

    /// ED - `ESC [ n J`
    DisplayErase { mode: EraseMode },

    /// `ESC [ ? 2004 h` / `ESC [ ? 2004 l`
    BracketedPaste { enable: bool },

    /// A CSI sequence the engine consumes without acting on it
    Unhandled { params: String, final_char: char },
}

impl ControlToken {
    /// Whether the engine changes any state for this token
    pub fn is_effective(&self) -> bool {
        !matches!(
            self,
            ControlToken::BracketedPaste { .. } | ControlToken::Unhandled { .. }
        )
    }
}
