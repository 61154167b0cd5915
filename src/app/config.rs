//! Configuration for REPL sessions

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::Color;
use crate::terminal::{EngineOptions, DEFAULT_MAX_COLUMNS, DEFAULT_MAX_ROWS};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpret control sequences; when off, output is appended verbatim
    pub emulate_ansi_csi: bool,
    /// Strip SGR sequences instead of turning them into style regions
    pub filter_ascii_color_codes: bool,
    /// Clamp upward cursor moves to `terminal_height` lines
    pub ansi_limit_cursor_up: bool,
    /// Nominal terminal height in lines
    pub terminal_height: usize,
    /// Largest downward move or coordinate row honored
    pub max_cursor_rows: usize,
    /// Largest forward move or coordinate column honored
    pub max_cursor_columns: usize,
    /// Trace raw input and inserted text on the `replterm::raw` target
    pub debug_ansi: bool,
    /// Characters of queued output to batch before writing to the view
    pub read_buffer: usize,
    /// Erase the echoed input line when a command is committed
    pub suppress_echo: bool,
    /// Appended to user input when it is committed
    pub cmd_postfix: String,
    /// Theme background, used for style regions that have no background
    pub background: Color,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emulate_ansi_csi: true,
            filter_ascii_color_codes: false,
            ansi_limit_cursor_up: false,
            terminal_height: 24,
            max_cursor_rows: DEFAULT_MAX_ROWS,
            max_cursor_columns: DEFAULT_MAX_COLUMNS,
            debug_ansi: false,
            read_buffer: 32_768,
            suppress_echo: false,
            cmd_postfix: "\n".to_string(),
            background: Color::from_hex(0x000000),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        // Try to load from ~/.config/replterm/config.json
        if let Some(config_path) = default_path() {
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Engine switches derived from these settings
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            color: !self.filter_ascii_color_codes,
            limit_cursor_up: self
                .ansi_limit_cursor_up
                .then_some(self.terminal_height),
            max_rows: self.max_cursor_rows,
            max_columns: self.max_cursor_columns,
            debug: self.debug_ansi,
        }
    }
}

/// Path of the configuration file in the user's config directory
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("replterm")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
