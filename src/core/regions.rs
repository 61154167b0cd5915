//! Style regions
//!
//! A display surface that cannot store per-character attributes colors text
//! through named regions instead: every styled insertion is filed under a
//! scope derived from its colors, and each scope needs one color-scheme rule.
//! `StyleRegions` keeps both, and moves the regions along as the buffer is
//! edited the way an editor does with its own region sets.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{Color, Style};

/// One color-scheme rule for a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
    pub background: Color,
}

#[derive(Debug, Clone)]
struct Scope {
    style: Style,
    regions: Vec<Range<usize>>,
}

/// Scope registry plus the regions filed under each scope
#[derive(Debug, Clone, Default)]
pub struct StyleRegions {
    scopes: BTreeMap<String, Scope>,
    /// Scopes seen for the first time since the last `take_pending_rules`
    pending: Vec<String>,
}

impl StyleRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `start..end` as carrying `style`. A range that continues the
    /// scope's last range is merged into it.
    pub fn add(&mut self, start: usize, end: usize, style: &Style) {
        if start >= end {
            return;
        }
        let key = style.scope_key();
        let scope = self.scopes.entry(key.clone()).or_insert_with(|| {
            self.pending.push(key);
            Scope {
                style: *style,
                regions: Vec::new(),
            }
        });
        match scope.regions.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => scope.regions.push(start..end),
        }
    }

    /// Regions filed under a scope key
    pub fn regions(&self, scope: &str) -> &[Range<usize>] {
        self.scopes
            .get(scope)
            .map(|s| s.regions.as_slice())
            .unwrap_or(&[])
    }

    /// Style covering the character at `pos`, if any.
    ///
    /// Later insertions win when regions overlap.
    pub fn style_at(&self, pos: usize) -> Option<Style> {
        self.scopes
            .values()
            .flat_map(|scope| scope.regions.iter().map(move |r| (r, scope.style)))
            .filter(|(r, _)| r.contains(&pos))
            .max_by_key(|(r, _)| r.start)
            .map(|(_, style)| style)
    }

    /// Number of registered scopes
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Iterate `(scope, style, regions)` in scope order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Style, &[Range<usize>])> + '_ {
        self.scopes
            .iter()
            .map(|(key, scope)| (key.as_str(), &scope.style, scope.regions.as_slice()))
    }

    /// Shift regions for `len` characters inserted at `pos`
    pub fn on_insert(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for region in self.scopes.values_mut().flat_map(|s| s.regions.iter_mut()) {
            if region.start >= pos {
                region.start += len;
                region.end += len;
            } else if region.end > pos {
                region.end += len;
            }
        }
    }

    /// Collapse regions for the erased range `start..end`
    pub fn on_erase(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let len = end - start;
        let clamp = |p: usize| {
            if p >= end {
                p - len
            } else if p > start {
                start
            } else {
                p
            }
        };
        for scope in self.scopes.values_mut() {
            for region in scope.regions.iter_mut() {
                *region = clamp(region.start)..clamp(region.end);
            }
            scope.regions.retain(|r| !r.is_empty());
        }
    }

    /// Rules for scopes registered since the last call.
    ///
    /// A scope without a background gets the theme background nudged by one
    /// in its lowest hex digit, so the region stays addressable by the
    /// color scheme without visibly changing.
    pub fn take_pending_rules(&mut self, background: Color) -> Vec<ScopeRule> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|key| {
                let scope = self.scopes.get(&key)?;
                Some(ScopeRule {
                    foreground: scope.style.fg,
                    background: scope.style.bg.unwrap_or_else(|| nudge(background)),
                    scope: key,
                })
            })
            .collect()
    }
}

fn nudge(color: Color) -> Color {
    let b = if color.b & 0x0f == 0x0f {
        color.b - 1
    } else {
        color.b + 1
    };
    Color { b, ..color }
}
