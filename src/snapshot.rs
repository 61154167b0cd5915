//! Session snapshots
//!
//! Snapshots capture the state of a session over a [`TextBuffer`] in a
//! serializable format for testing and debugging. Given the same byte stream,
//! a session must produce identical snapshots.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{ScopeRule, Style, TextBuffer};
use crate::session::{InputSink, Session};

/// A complete snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whole buffer, output plus prompt plus input
    pub text: String,
    /// Engine cursor offset
    pub cursor: usize,
    pub output_end: usize,
    pub prompt_size: usize,
    /// Escape fragment held back for the next chunk
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pending: String,
    /// Styled regions, grouped by scope
    pub regions: Vec<RegionSnapshot>,
    /// Color-scheme rules for every scope, oldest first
    pub rules: Vec<ScopeRule>,
}

/// Regions filed under one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub scope: String,
    pub style: Style,
    pub ranges: Vec<Range<usize>>,
}

impl Snapshot {
    pub fn from_session<S: InputSink>(session: &Session<TextBuffer, S>) -> Self {
        let view = session.view();
        let regions = view.buffer().regions();
        Snapshot {
            text: view.buffer().to_string(),
            cursor: session.engine().cursor(),
            output_end: view.output_end(),
            prompt_size: view.prompt_size(),
            pending: session.engine().pending().to_string(),
            regions: regions
                .iter()
                .map(|(scope, style, ranges)| RegionSnapshot {
                    scope: scope.to_string(),
                    style: *style,
                    ranges: ranges.to_vec(),
                })
                .collect(),
            rules: regions
                .clone()
                .take_pending_rules(session.config().background),
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The buffer text with the output boundary marked, for debugging
    pub fn to_text(&self) -> String {
        let split = self
            .text
            .char_indices()
            .nth(self.output_end)
            .map_or(self.text.len(), |(i, _)| i);
        let (output, input) = self.text.split_at(split);
        format!("{}\u{2502}{}", output, input)
    }
}
