//! Buffer adapter
//!
//! The engine never owns the text it edits. It drives a `Buffer`: a linear
//! sequence of characters addressed by absolute character offsets, with
//! insert and erase as the only mutations. `TextBuffer` is the in-memory
//! implementation used by the headless runner and the tests.

use std::fmt;
use std::ops::Range;

use super::{Style, StyleRegions};
use crate::error::{Error, Result};

/// Display surface the engine writes into
pub trait Buffer {
    /// Number of characters in the buffer
    fn size(&self) -> usize;

    /// Text of the characters in `range`
    fn text(&self, range: Range<usize>) -> Result<String>;

    /// Insert `text` so that its first character lands at `pos`
    fn insert(&mut self, pos: usize, text: &str) -> Result<()>;

    /// Remove the characters in `start..end`
    fn erase(&mut self, start: usize, end: usize) -> Result<()>;

    /// Attach a style to `start..end`. Surfaces without color support keep
    /// the default, which ignores the annotation.
    fn annotate(&mut self, _start: usize, _end: usize, _style: &Style) -> Result<()> {
        Ok(())
    }

    /// Offset of the last `\n` before `before`.
    ///
    /// The default scans backwards through `text` in windows so a surface
    /// only ever hands out a bounded slice per call.
    fn rfind_newline(&self, before: usize) -> Result<Option<usize>> {
        let mut end = before.min(self.size());
        while end > 0 {
            let start = end.saturating_sub(SCAN_WINDOW);
            let window: Vec<char> = self.text(start..end)?.chars().collect();
            if let Some(i) = window.iter().rposition(|&c| c == '\n') {
                return Ok(Some(start + i));
            }
            end = start;
        }
        Ok(None)
    }

    /// Offset of the first `\n` in `from..to`
    fn find_newline(&self, from: usize, to: usize) -> Result<Option<usize>> {
        let to = to.min(self.size());
        let mut start = from;
        while start < to {
            let end = (start + SCAN_WINDOW).min(to);
            if let Some(i) = self.text(start..end)?.chars().position(|c| c == '\n') {
                return Ok(Some(start + i));
            }
            start = end;
        }
        Ok(None)
    }
}

/// Characters fetched per `text` call by the default newline scans
const SCAN_WINDOW: usize = 1024;

/// In-memory buffer with region tracking
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    chars: Vec<char>,
    regions: StyleRegions,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text`
    pub fn with_text(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            regions: StyleRegions::new(),
        }
    }

    /// Style regions recorded through `annotate`
    pub fn regions(&self) -> &StyleRegions {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut StyleRegions {
        &mut self.regions
    }

    /// Text of line `index` (0-based, split on `\n`)
    pub fn line(&self, index: usize) -> Option<String> {
        self.chars
            .split(|&c| c == '\n')
            .nth(index)
            .map(|line| line.iter().collect())
    }

    fn check(&self, start: usize, end: usize) -> Result<()> {
        if start > end || end > self.chars.len() {
            return Err(Error::OutOfBounds {
                start,
                end,
                size: self.chars.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

impl Buffer for TextBuffer {
    fn size(&self) -> usize {
        self.chars.len()
    }

    fn text(&self, range: Range<usize>) -> Result<String> {
        self.check(range.start, range.end)?;
        Ok(self.chars[range].iter().collect())
    }

    fn insert(&mut self, pos: usize, text: &str) -> Result<()> {
        self.check(pos, pos)?;
        let before = self.chars.len();
        self.chars.splice(pos..pos, text.chars());
        self.regions.on_insert(pos, self.chars.len() - before);
        Ok(())
    }

    fn erase(&mut self, start: usize, end: usize) -> Result<()> {
        self.check(start, end)?;
        self.chars.drain(start..end);
        self.regions.on_erase(start, end);
        Ok(())
    }

    fn annotate(&mut self, start: usize, end: usize, style: &Style) -> Result<()> {
        self.check(start, end)?;
        self.regions.add(start, end, style);
        Ok(())
    }

    fn rfind_newline(&self, before: usize) -> Result<Option<usize>> {
        let before = before.min(self.chars.len());
        Ok(self.chars[..before].iter().rposition(|&c| c == '\n'))
    }

    fn find_newline(&self, from: usize, to: usize) -> Result<Option<usize>> {
        let to = to.min(self.chars.len());
        if from >= to {
            return Ok(None);
        }
        Ok(self.chars[from..to]
            .iter()
            .position(|&c| c == '\n')
            .map(|i| from + i))
    }
}
