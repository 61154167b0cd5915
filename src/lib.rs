//! replterm: terminal emulation for REPL views
//!
//! Interprets the control sequences a line-oriented program writes (cursor
//! moves, line and display erases, SGR colors) against a linear text buffer
//! instead of a cell grid. This crate provides:
//!
//! - `core`: Buffer adapter, output boundary, cursor model, styles and palette
//! - `parser`: Control-sequence tokenizer and SGR color annotation
//! - `terminal`: The engine that applies output chunks to a buffer
//! - `session`: REPL view with prompt/input handling and a background reader
//! - `snapshot`: Serializable session state for tests and debugging
//! - `app`: Configuration

pub mod app;
pub mod core;
pub mod error;
pub mod parser;
pub mod session;
pub mod snapshot;
pub mod terminal;

pub use crate::app::Config;
pub use crate::core::{Buffer, Color, Style, TextBuffer, View};
pub use error::{Error, Result};
pub use session::{InputSink, Packet, Session};
pub use snapshot::Snapshot;
pub use terminal::{EngineOptions, TerminalEngine};
