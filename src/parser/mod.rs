//! Control-sequence parser
//!
//! Turns raw output text into literal runs and control tokens, and decodes
//! SGR runs inside the literal text into styled sections.

mod color;
pub mod sgr;
mod token;
pub mod tokenizer;

pub use color::{ColorStreamAnnotator, TextSection};
pub use sgr::SgrUpdate;
pub use token::{ControlToken, Direction, EraseMode};
pub use tokenizer::Match;
