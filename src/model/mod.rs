//! Structured text model of a rendered page.
//!
//! This module defines the representation that bridges the rendering
//! engine and the JSON serializer: a page is a list of blocks, text blocks
//! hold lines, lines hold characters, characters point at fonts.

mod font;
mod geometry;
mod stext;

pub use font::{Font, FontFlags, FontId, FontQuery, FontTable};
pub use geometry::{Matrix, Point, Rect};
pub use stext::{BlockKind, ImageSource, StextBlock, StextChar, StextLine, StextPage};
