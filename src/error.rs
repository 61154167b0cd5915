//! Error types
//!
//! Malformed control sequences are never errors; they are ignored by the
//! tokenizer and the SGR decoder. What does surface here are failures of the
//! collaborators around the engine: the buffer adapter rejecting a mutation,
//! the reader thread losing its source, the input sink going away.

use std::io;
use thiserror::Error;

use crate::app::ConfigError;

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    /// A mutation or query referenced characters outside the buffer
    #[error("range {start}..{end} is outside the buffer (size {size})")]
    OutOfBounds {
        start: usize,
        end: usize,
        size: usize,
    },

    /// The display surface rejected a mutation
    #[error("buffer error: {0}")]
    Buffer(String),

    /// I/O error from an output source or input sink
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The input sink has been closed
    #[error("input sink disconnected")]
    Disconnected,
}

/// Result type for buffer and session operations
pub type Result<T> = std::result::Result<T, Error>;
