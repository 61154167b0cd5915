//! Cursor over a linear buffer
//!
//! There is no grid: the cursor is a single character offset, and rows and
//! columns only exist as the spans between newlines. Moving between lines
//! therefore has to edit the buffer when the destination line is too short
//! (pad with spaces) or does not exist yet (append a newline).

use super::{Buffer, Style, View};
use crate::error::Result;

/// Cursor operations bound to one view for the duration of a control token
pub struct CursorModel<'a, B> {
    pos: &'a mut usize,
    view: &'a mut View<B>,
}

impl<'a, B: Buffer> CursorModel<'a, B> {
    pub fn new(pos: &'a mut usize, view: &'a mut View<B>) -> Self {
        Self { pos, view }
    }

    /// Current offset
    pub fn pos(&self) -> usize {
        *self.pos
    }

    /// Start of the cursor's line, or `None` if no newline precedes the
    /// cursor (the line starts at offset 0)
    pub fn find_line_start(&self) -> Result<Option<usize>> {
        Ok(self.view.buffer().rfind_newline(*self.pos)?.map(|nl| nl + 1))
    }

    /// Offset of the newline ending the cursor's line, or `None` if the line
    /// runs to the live end of output
    pub fn find_line_end(&self) -> Result<Option<usize>> {
        self.view.buffer().find_newline(*self.pos, self.view.text_end())
    }

    pub fn line_start(&self) -> Result<usize> {
        Ok(self.find_line_start()?.unwrap_or(0))
    }

    pub fn line_end(&self) -> Result<usize> {
        Ok(self
            .find_line_end()?
            .unwrap_or_else(|| self.view.text_end()))
    }

    /// Move up `n` lines, keeping the column where the line allows it.
    ///
    /// Stops early at the first line.
    pub fn move_up(&mut self, n: usize) -> Result<()> {
        let mut offset = None;
        for _ in 0..n {
            let Some(start) = self.find_line_start()? else {
                break;
            };
            offset.get_or_insert(*self.pos - start);
            // The newline ending the previous line
            *self.pos = start - 1;
            *self.pos = self.line_start()?;
        }
        match offset {
            Some(offset) => self.pad_to_offset(offset),
            None => Ok(()),
        }
    }

    /// Move down `n` lines, creating lines past the end of output as needed
    pub fn move_down(&mut self, n: usize) -> Result<()> {
        let offset = self.pos.saturating_sub(self.line_start()?);
        for _ in 0..n {
            match self.find_line_end()? {
                Some(end) => *self.pos = end + 1,
                None => {
                    *self.pos = self.view.text_end();
                    self.insert_append("\n", None)?;
                }
            }
        }
        self.pad_to_offset(offset)
    }

    /// Move right `n` columns. Past the end of the line the gap is filled
    /// with spaces, which is how progress bars advance over blank space.
    pub fn move_forward(&mut self, n: usize) -> Result<()> {
        let end = self.line_end()?;
        let target = *self.pos + n;
        if target > end {
            *self.pos = end;
            self.insert_overwrite(&" ".repeat(target - end), None)
        } else {
            *self.pos = target;
            Ok(())
        }
    }

    /// Move left `n` columns, stopping at the start of the line.
    ///
    /// Never wraps to the previous line: some programs (htop among them)
    /// send backward moves longer than the current column.
    pub fn move_backward(&mut self, n: usize) -> Result<()> {
        let start = self.line_start()?;
        *self.pos = self.pos.saturating_sub(n).max(start);
        Ok(())
    }

    /// Jump to `row` lines below the start of the buffer, then `col` columns
    /// right
    pub fn move_to_coordinate(&mut self, row: usize, col: usize) -> Result<()> {
        *self.pos = 0;
        if row > 0 {
            self.move_down(row)?;
        }
        if col > 0 {
            self.move_forward(col)?;
        }
        Ok(())
    }

    /// Move to the start of the current line
    pub fn carriage_return(&mut self) -> Result<()> {
        *self.pos = self.line_start()?;
        Ok(())
    }

    /// Insert at the cursor and advance past the inserted text
    pub fn insert_append(&mut self, text: &str, style: Option<&Style>) -> Result<()> {
        let len = self.view.insert(*self.pos, text, style)?;
        *self.pos += len;
        Ok(())
    }

    /// Overwrite from the cursor. Only the rest of the current line is
    /// replaced; text longer than that is inserted in front of the newline.
    pub fn insert_overwrite(&mut self, text: &str, style: Option<&Style>) -> Result<()> {
        let remaining = self.line_end()?.saturating_sub(*self.pos);
        let overwrite = remaining.min(text.chars().count());
        let start = *self.pos;
        self.erase(start, start + overwrite)?;
        self.insert_append(text, style)
    }

    /// Erase `start..end` and keep the cursor on the same character
    pub fn erase(&mut self, start: usize, end: usize) -> Result<()> {
        let len = self.view.erase(start, end)?;
        if len == 0 {
            return Ok(());
        }
        if *self.pos >= end {
            *self.pos -= len;
        } else if *self.pos > start {
            *self.pos = start;
        }
        Ok(())
    }

    /// Step right `offset` columns on the current line, padding the line
    /// with spaces if it is shorter than that
    fn pad_to_offset(&mut self, offset: usize) -> Result<()> {
        let end = self.line_end()?;
        let target = *self.pos + offset;
        if target > end {
            *self.pos = end;
            self.insert_append(&" ".repeat(target - end), None)
        } else {
            *self.pos = target;
            Ok(())
        }
    }
}
