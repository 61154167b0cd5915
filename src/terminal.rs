//! Terminal Engine
//!
//! Ties together the tokenizer, the cursor model and the color annotator,
//! and applies a chunk of program output to a [`View`]. This is the main
//! integration point between parsing and the buffer.
//!
//! The engine's state is the cursor offset, the live style (inside the
//! annotator) and any escape sequence left unfinished at the end of the
//! previous chunk. The output boundary lives in the view.
//!
//! # Attached and detached
//!
//! While the cursor sits at the live end of output, literal text is
//! appended and a bare `\n` is ordinary text. Once a control token has moved
//! the cursor elsewhere, literal text overwrites the current line and
//! newlines are interpreted as cursor movement.

use tracing::{debug, trace};

use crate::core::{Buffer, CursorModel, Style, View};
use crate::error::Result;
use crate::parser::{tokenizer, ColorStreamAnnotator, ControlToken, Direction, EraseMode};

/// Longest unfinished escape sequence held back for the next chunk, in
/// characters. Anything longer is released as literal text.
pub const MAX_PENDING: usize = 256;

/// Default for [`EngineOptions::max_rows`]
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Default for [`EngineOptions::max_columns`]
pub const DEFAULT_MAX_COLUMNS: usize = 1000;

/// Engine switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Decode SGR into style annotations; when off, SGR is stripped
    pub color: bool,
    /// Clamp upward cursor moves to this many lines
    pub limit_cursor_up: Option<usize>,
    /// Largest downward move or coordinate row honored. Moving down past the
    /// last line creates lines, so this bounds the newlines one sequence adds.
    pub max_rows: usize,
    /// Largest forward move or coordinate column honored, bounding padding
    pub max_columns: usize,
    /// Emit raw input and inserted text as trace events on `replterm::raw`
    pub debug: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            color: true,
            limit_cursor_up: None,
            max_rows: DEFAULT_MAX_ROWS,
            max_columns: DEFAULT_MAX_COLUMNS,
            debug: false,
        }
    }
}

/// Control-sequence interpreter over a linear buffer
#[derive(Debug, Clone, Default)]
pub struct TerminalEngine {
    /// Absolute character offset of the cursor
    cursor: usize,
    annotator: ColorStreamAnnotator,
    options: EngineOptions,
    /// Unfinished escape sequence from the end of the last chunk
    pending: String,
}

impl TerminalEngine {
    /// Create an engine with its cursor at offset 0
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Current cursor offset
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to `pos`, typically the view's live end after the
    /// surrounding session edited the buffer itself
    pub fn attach(&mut self, pos: usize) {
        self.cursor = pos;
    }

    /// The live style
    pub fn style(&self) -> &Style {
        self.annotator.style()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Text held back waiting for the rest of an escape sequence
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Whether the cursor has been moved away from the live end of output
    pub fn is_detached<B: Buffer>(&self, view: &View<B>) -> bool {
        self.cursor != view.text_end()
    }

    /// Apply one chunk of program output.
    ///
    /// Every buffer mutation for the chunk happens before this returns. An
    /// escape sequence cut off by the end of the chunk is held back and
    /// completed by the next call.
    pub fn run<B: Buffer>(&mut self, view: &mut View<B>, chunk: &str) -> Result<()> {
        if chunk.is_empty() && self.pending.is_empty() {
            return Ok(());
        }

        let mut input = std::mem::take(&mut self.pending);
        input.push_str(chunk);
        if let Some(split) = tokenizer::incomplete_tail(&input) {
            if input[split..].chars().count() <= MAX_PENDING {
                self.pending = input.split_off(split);
            } else {
                debug!("releasing oversized unfinished escape sequence as text");
            }
        }

        self.process(view, &input)
    }

    /// Release any held-back fragment as literal text
    pub fn flush<B: Buffer>(&mut self, view: &mut View<B>) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        self.process(view, &pending)
    }

    fn process<B: Buffer>(&mut self, view: &mut View<B>, input: &str) -> Result<()> {
        if input.is_empty() {
            return Ok(());
        }
        if self.options.debug {
            trace!(target: "replterm::raw", input, "raw input");
        }

        let text = tokenizer::normalize(input);
        let mut rest: &str = &text;
        while !rest.is_empty() {
            let Some(m) = tokenizer::next_token(rest, self.is_detached(view)) else {
                break;
            };
            if !m.prefix.is_empty() {
                self.insert(view, m.prefix)?;
            }
            self.apply(view, m.token)?;
            rest = m.rest;
        }
        if !rest.is_empty() {
            self.insert(view, rest)?;
        }
        Ok(())
    }

    /// Insert literal text, styled if color is enabled
    fn insert<B: Buffer>(&mut self, view: &mut View<B>, text: &str) -> Result<()> {
        if !self.options.color {
            return self.insert_section(view, text, None);
        }
        let (_, sections) = self.annotator.run(text);
        for section in &sections {
            self.insert_section(view, &section.text, section.style.as_ref())?;
        }
        Ok(())
    }

    fn insert_section<B: Buffer>(
        &mut self,
        view: &mut View<B>,
        text: &str,
        style: Option<&Style>,
    ) -> Result<()> {
        let text = tokenizer::strip_escapes(text);
        if text.is_empty() {
            return Ok(());
        }
        if self.options.debug {
            trace!(target: "replterm::raw", text = %text, "output");
        }

        let detached = self.is_detached(view);
        let mut cursor = CursorModel::new(&mut self.cursor, view);
        if detached {
            cursor.insert_overwrite(&text, style)
        } else {
            cursor.insert_append(&text, style)
        }
    }

    /// Apply a control token
    fn apply<B: Buffer>(&mut self, view: &mut View<B>, token: ControlToken) -> Result<()> {
        trace!(?token, cursor = self.cursor, "control token");
        let size = view.buffer().size();
        let limit_up = self.options.limit_cursor_up;
        let (max_rows, max_columns) = (self.options.max_rows, self.options.max_columns);
        let mut cursor = CursorModel::new(&mut self.cursor, view);

        match token {
            ControlToken::Newline => {
                cursor.carriage_return()?;
                cursor.move_down(1)
            }
            ControlToken::CarriageReturn => cursor.carriage_return(),
            ControlToken::CursorMove { dir, count } => match dir {
                Direction::Up => cursor.move_up(limit_up.map_or(count, |limit| count.min(limit))),
                Direction::Down => cursor.move_down(count.min(max_rows)),
                Direction::Forward => cursor.move_forward(count.min(max_columns)),
                Direction::Backward => cursor.move_backward(count),
            },
            ControlToken::CursorCoordinate { row, col } => {
                cursor.move_to_coordinate(row.min(max_rows), col.min(max_columns))
            }
            ControlToken::LineErase { mode } => {
                let (start, end) = match mode {
                    EraseMode::ToEnd => (cursor.pos(), cursor.line_end()?),
                    EraseMode::ToStart => (cursor.line_start()?, cursor.pos()),
                    EraseMode::Whole => (cursor.line_start()?, cursor.line_end()?),
                };
                cursor.erase(start, end)
            }
            ControlToken::DisplayErase { mode } => {
                let (start, end) = match mode {
                    EraseMode::ToEnd => (cursor.pos(), size),
                    EraseMode::ToStart => (0, cursor.pos()),
                    EraseMode::Whole => (0, size),
                };
                cursor.erase(start, end)
            }
            // Paste mode is not tracked
            ControlToken::BracketedPaste { .. } => Ok(()),
            ControlToken::Unhandled { params, final_char } => {
                debug!(%params, %final_char, "unhandled CSI sequence");
                Ok(())
            }
        }
    }
}
