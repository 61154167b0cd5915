//! Color stream annotator
//!
//! Splits literal text at its SGR runs and tags each piece with the live
//! style. The style persists across calls until a reset. Until the stream
//! has shown any non-default style, text without SGR passes straight
//! through unannotated.

use serde::Serialize;

use super::sgr;
use crate::core::Style;

/// A run of literal text and the style to annotate it with.
///
/// `style: None` means "do not annotate", which is different from
/// annotating with the default style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSection {
    pub text: String,
    pub style: Option<Style>,
}

/// Live style plus the sticky "any color seen" flag
#[derive(Debug, Clone, Default)]
pub struct ColorStreamAnnotator {
    style: Style,
    style_changed: bool,
}

/// One or more adjacent `ESC [ ... m` sequences
struct SgrRun<'a> {
    start: usize,
    end: usize,
    bodies: Vec<&'a str>,
}

impl ColorStreamAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live style
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Whether a non-default style has ever been applied
    pub fn style_changed(&self) -> bool {
        self.style_changed
    }

    /// Split `text` into sections.
    ///
    /// The flag is false when the fast path was taken and the text came back
    /// whole and unannotated.
    pub fn run(&mut self, text: &str) -> (bool, Vec<TextSection>) {
        if !self.style_changed && find_sgr_run(text).is_none() {
            let sections = if text.is_empty() {
                Vec::new()
            } else {
                vec![TextSection {
                    text: text.to_string(),
                    style: None,
                }]
            };
            return (false, sections);
        }

        let mut sections = Vec::new();
        let mut rest = text;
        while let Some(run) = find_sgr_run(rest) {
            self.push_section(&mut sections, &rest[..run.start]);
            for body in run.bodies {
                self.apply(body);
            }
            rest = &rest[run.end..];
        }
        self.push_section(&mut sections, rest);
        (true, sections)
    }

    fn apply(&mut self, body: &str) {
        let Some(update) = sgr::decode(body) else {
            return;
        };
        update.apply(&mut self.style);
        if !self.style.is_default() {
            self.style_changed = true;
        }
    }

    fn push_section(&self, sections: &mut Vec<TextSection>, text: &str) {
        if text.is_empty() {
            return;
        }
        sections.push(TextSection {
            text: text.to_string(),
            style: self.style_changed.then_some(self.style),
        });
    }
}

/// Find the first SGR run in `text`, with a shift-in directly after it
/// counted as part of the run
fn find_sgr_run(text: &str) -> Option<SgrRun<'_>> {
    let mut search = 0;
    loop {
        let start = search + text[search..].find("\x1b[")?;
        let mut end = start;
        let mut bodies = Vec::new();
        while let Some(len) = sgr_len(&text[end..]) {
            bodies.push(&text[end + 2..end + len - 1]);
            end += len;
        }
        if bodies.is_empty() {
            search = start + 2;
            continue;
        }
        if text[end..].starts_with('\x0f') {
            end += 1;
        }
        return Some(SgrRun { start, end, bodies });
    }
}

/// Length of an SGR sequence at the start of `text`
fn sgr_len(text: &str) -> Option<usize> {
    let params = text.strip_prefix("\x1b[")?;
    let len = params
        .bytes()
        .take_while(|&b| b.is_ascii_digit() || b == b';')
        .count();
    (params.as_bytes().get(len) == Some(&b'm')).then_some(len + 3)
}
