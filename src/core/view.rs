//! Buffer plus output boundary
//!
//! The buffer holds more than program output: after `output_end` comes the
//! text the user is typing, and the last `prompt_size` characters before it
//! are the current prompt. New output is written in front of the prompt, so
//! the live end of output is `output_end - prompt_size`.

use super::{Buffer, Style};
use crate::error::Result;

/// A buffer with its committed-output boundary
#[derive(Debug, Clone)]
pub struct View<B> {
    buffer: B,
    output_end: usize,
    prompt_size: usize,
}

impl<B: Buffer> View<B> {
    /// Wrap a buffer; everything already in it counts as output
    pub fn new(buffer: B) -> Self {
        let output_end = buffer.size();
        Self {
            buffer,
            output_end,
            prompt_size: 0,
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    pub fn output_end(&self) -> usize {
        self.output_end
    }

    pub fn set_output_end(&mut self, output_end: usize) {
        self.output_end = output_end.min(self.buffer.size());
    }

    pub fn prompt_size(&self) -> usize {
        self.prompt_size
    }

    pub fn set_prompt_size(&mut self, prompt_size: usize) {
        self.prompt_size = prompt_size.min(self.output_end);
    }

    /// Live end of output, where appended text lands
    pub fn text_end(&self) -> usize {
        self.output_end.saturating_sub(self.prompt_size)
    }

    /// Insert at `pos`, advancing the boundary. Returns the inserted length.
    pub fn insert(&mut self, pos: usize, text: &str, style: Option<&Style>) -> Result<usize> {
        let len = text.chars().count();
        if len == 0 {
            return Ok(0);
        }
        self.buffer.insert(pos, text)?;
        if pos <= self.output_end {
            self.output_end += len;
        }
        if let Some(style) = style {
            self.buffer.annotate(pos, pos + len, style)?;
        }
        Ok(len)
    }

    /// Erase `start..end`, pulling the boundary back by the part of the range
    /// that lay in front of it. Returns the erased length.
    pub fn erase(&mut self, start: usize, end: usize) -> Result<usize> {
        if end <= start {
            return Ok(0);
        }
        self.buffer.erase(start, end)?;

        let prompt_start = self.text_end();
        let prompt_overlap = end
            .min(self.output_end)
            .saturating_sub(start.max(prompt_start));
        let output_overlap = end.min(self.output_end).saturating_sub(start);
        self.prompt_size -= prompt_overlap;
        self.output_end -= output_overlap;
        Ok(end - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, TextBuffer};

    #[test]
    fn test_new_counts_existing_text_as_output() {
        let view = View::new(TextBuffer::with_text("hello"));
        assert_eq!(view.output_end(), 5);
        assert_eq!(view.text_end(), 5);
    }

    #[test]
    fn test_insert_advances_boundary() {
        let mut view = View::new(TextBuffer::new());
        assert_eq!(view.insert(0, "abc", None).unwrap(), 3);
        assert_eq!(view.output_end(), 3);
        assert_eq!(view.insert(0, "", None).unwrap(), 0);
        assert_eq!(view.output_end(), 3);
    }

    #[test]
    fn test_insert_annotates() {
        let mut view = View::new(TextBuffer::new());
        let style = Style {
            fg: Some(Color::from_hex(0xcd0000)),
            ..Default::default()
        };
        view.insert(0, "red", Some(&style)).unwrap();
        assert_eq!(view.buffer().regions().regions(&style.scope_key()), &[0..3]);
    }

    #[test]
    fn test_erase_pulls_boundary() {
        let mut view = View::new(TextBuffer::with_text("abcdef"));
        assert_eq!(view.erase(1, 3).unwrap(), 2);
        assert_eq!(view.output_end(), 4);
        assert_eq!(view.erase(3, 3).unwrap(), 0);
        assert_eq!(view.buffer().to_string(), "adef");
    }

    #[test]
    fn test_erase_through_prompt_and_input() {
        // "out" + prompt "> " + user input "ls"
        let mut view = View::new(TextBuffer::with_text("out> ls"));
        view.set_output_end(5);
        view.set_prompt_size(2);
        assert_eq!(view.text_end(), 3);

        view.erase(0, 7).unwrap();
        assert_eq!(view.output_end(), 0);
        assert_eq!(view.prompt_size(), 0);
        assert_eq!(view.text_end(), 0);
    }

    #[test]
    fn test_erase_inside_output_keeps_prompt() {
        let mut view = View::new(TextBuffer::with_text("output> "));
        view.set_prompt_size(2);
        view.erase(0, 3).unwrap();
        assert_eq!(view.output_end(), 5);
        assert_eq!(view.prompt_size(), 2);
        assert_eq!(view.text_end(), 3);
    }
}
