//! In-memory command history with prefix search

/// Committed commands, oldest first
#[derive(Debug, Clone, Default)]
pub struct History {
    commands: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command. Trailing whitespace is trimmed; blank commands and
    /// repeats of the last command are skipped.
    pub fn push(&mut self, command: &str) {
        let command = command.trim_end();
        if command.is_empty() || self.commands.last().map(String::as_str) == Some(command) {
            return;
        }
        self.commands.push(command.to_string());
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Commands starting with `prefix`, positioned past the newest
    pub fn matching(&self, prefix: &str) -> HistoryMatch {
        let commands: Vec<String> = self
            .commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect();
        HistoryMatch {
            cur: commands.len(),
            commands,
        }
    }
}

/// A navigable list of history entries
#[derive(Debug, Clone)]
pub struct HistoryMatch {
    commands: Vec<String>,
    cur: usize,
}

impl HistoryMatch {
    /// Entry under the cursor, or `""` before the first step back
    pub fn current(&self) -> &str {
        self.commands.get(self.cur).map_or("", String::as_str)
    }

    /// Step to the older entry, stopping at the oldest
    pub fn prev(&mut self) -> &str {
        self.cur = self.cur.saturating_sub(1);
        self.current()
    }

    /// Step to the newer entry, stopping at the newest
    pub fn next(&mut self) -> &str {
        self.cur = (self.cur + 1).min(self.commands.len().saturating_sub(1));
        self.current()
    }
}
