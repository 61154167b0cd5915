//! Display Core Module
//!
//! The state the engine edits, independent of escape-sequence parsing:
//! - Buffer adapter trait and the in-memory buffer
//! - View: buffer plus output boundary and prompt size
//! - Cursor model over a linear buffer
//! - Text style, palette and style regions
//!
//! Everything here is deterministic: the same sequence of edits always
//! produces the same buffer, boundary and regions.

mod buffer;
mod cursor;
pub mod palette;
mod regions;
mod style;
mod view;

pub use buffer::{Buffer, TextBuffer};
pub use cursor::CursorModel;
pub use regions::{ScopeRule, StyleRegions};
pub use style::{Color, ParseColorError, Style};
pub use view::View;
