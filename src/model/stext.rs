//! The structured text model: blocks, lines and characters of one page.
//!
//! Produced by a rendering engine and consumed read-only by the JSON
//! serializer. Order is source order; nothing here is sorted.

use std::fmt;

use super::{FontId, FontQuery, FontTable, Point, Rect};
use crate::error::Result;

/// An embedded raster image the serializer can ask to have PNG-encoded.
///
/// The serializer never looks at pixels; it only requests an encoding and
/// drops the returned buffer once it has been copied into the output.
pub trait ImageSource: fmt::Debug {
    /// Width in pixels.
    fn width(&self) -> u32;
    /// Height in pixels.
    fn height(&self) -> u32;
    /// Encode the image as a complete PNG file.
    fn encode_png(&self) -> Result<Vec<u8>>;
}

/// A single character with its position and font.
#[derive(Debug, Clone, PartialEq)]
pub struct StextChar {
    /// Unicode code point. Values that are not valid scalar values are
    /// emitted as U+FFFD.
    pub c: u32,
    /// Pen position on the baseline.
    pub origin: Point,
    /// Font size in page units.
    pub size: f32,
    /// Font used to draw the character.
    pub font: FontId,
    /// Area covered by the glyph.
    pub bbox: Rect,
}

impl StextChar {
    pub fn new(c: impl Into<u32>, origin: Point, size: f32, font: FontId) -> Self {
        Self {
            c: c.into(),
            origin,
            size,
            font,
            bbox: Rect::new(origin.x, origin.y - size * 0.8, origin.x, origin.y + size * 0.2),
        }
    }

    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = bbox;
        self
    }

    /// The character, if the code point is a valid scalar value.
    pub fn as_char(&self) -> Option<char> {
        char::from_u32(self.c)
    }
}

/// A line of characters sharing a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct StextLine {
    pub bbox: Rect,
    pub chars: Vec<StextChar>,
}

impl StextLine {
    pub fn new(bbox: Rect) -> Self {
        Self {
            bbox,
            chars: Vec::new(),
        }
    }

    /// Build a line whose bounding box covers all its characters.
    pub fn from_chars(chars: Vec<StextChar>) -> Self {
        let bbox = chars.iter().fold(Rect::EMPTY, |acc, ch| acc.union(&ch.bbox));
        Self { bbox, chars }
    }

    pub fn push(&mut self, ch: StextChar) {
        self.bbox = self.bbox.union(&ch.bbox);
        self.chars.push(ch);
    }

    /// The first character; its font is the line's dominant font.
    pub fn first_char(&self) -> Option<&StextChar> {
        self.chars.first()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Plain text of the line, with invalid code points replaced.
    pub fn text(&self) -> String {
        self.chars
            .iter()
            .map(|ch| ch.as_char().unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// What a block contains.
#[derive(Debug)]
pub enum BlockKind {
    /// Lines of text.
    Text(Vec<StextLine>),
    /// One embedded raster image.
    Image(Box<dyn ImageSource>),
    /// Anything the engine produced that is neither text nor image
    /// (vector graphics, structure markers, future kinds).
    Other,
}

/// A visually distinct region of the page.
#[derive(Debug)]
pub struct StextBlock {
    pub bbox: Rect,
    pub kind: BlockKind,
}

impl StextBlock {
    pub fn text(bbox: Rect, lines: Vec<StextLine>) -> Self {
        Self {
            bbox,
            kind: BlockKind::Text(lines),
        }
    }

    /// A text block whose bounding box covers its lines.
    pub fn from_lines(lines: Vec<StextLine>) -> Self {
        let bbox = lines.iter().fold(Rect::EMPTY, |acc, l| acc.union(&l.bbox));
        Self::text(bbox, lines)
    }

    pub fn image(bbox: Rect, image: Box<dyn ImageSource>) -> Self {
        Self {
            bbox,
            kind: BlockKind::Image(image),
        }
    }

    pub fn other(bbox: Rect) -> Self {
        Self {
            bbox,
            kind: BlockKind::Other,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, BlockKind::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, BlockKind::Image(_))
    }
}

/// Structured text of one page.
#[derive(Debug)]
pub struct StextPage {
    /// The media box the page was rendered into.
    pub mediabox: Rect,
    pub blocks: Vec<StextBlock>,
    pub fonts: FontTable,
}

impl StextPage {
    pub fn new(mediabox: Rect) -> Self {
        Self {
            mediabox,
            blocks: Vec::new(),
            fonts: FontTable::new(),
        }
    }

    pub fn push_block(&mut self, block: StextBlock) {
        self.blocks.push(block);
    }

    /// Capabilities of the font a character was drawn with.
    pub fn font(&self, id: FontId) -> Option<&dyn FontQuery> {
        self.fonts.get(id)
    }

    /// Text of every text block, lines separated by newlines and blocks by
    /// blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match &block.kind {
                BlockKind::Text(lines) => Some(
                    lines
                        .iter()
                        .map(StextLine::text)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
