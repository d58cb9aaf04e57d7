//! Block and line serialization.
//!
//! Each block becomes one JSON object, dispatched on its kind:
//!
//! ```text
//! {"type":"text","bbox":[x0,y0,x1,y1],"lines":[{"bbox":[..],"font":{..},"text":".."}]}
//! {"type":"image","bbox":[x0,y0,x1,y1],"data":"<base64>"}
//! {"type":"other"}
//! ```

use crate::error::Result;
use crate::model::{BlockKind, ImageSource, StextBlock, StextLine, StextPage};

use super::escape::escape_code_points;
use super::font::line_font;
use super::image::{encode, ImagePayload, IMAGE_TOO_LARGE};
use super::result::ExtractionStats;
use super::writer::JsonWriter;

/// Settings the block serializer needs from the extraction options.
#[derive(Debug, Clone, Copy)]
pub struct BlockSettings {
    pub include_image_data: bool,
    pub max_image_area: i64,
}

/// Write every block of `page`, comma separated, in page order.
pub fn write_blocks(
    w: &mut JsonWriter,
    page: &StextPage,
    settings: BlockSettings,
    stats: &mut ExtractionStats,
) -> Result<()> {
    for (i, block) in page.blocks.iter().enumerate() {
        if i > 0 {
            w.raw(",")?;
        }
        write_block(w, page, block, settings, stats)?;
    }
    Ok(())
}

/// Write one block object.
pub fn write_block(
    w: &mut JsonWriter,
    page: &StextPage,
    block: &StextBlock,
    settings: BlockSettings,
    stats: &mut ExtractionStats,
) -> Result<()> {
    match &block.kind {
        BlockKind::Text(lines) => {
            stats.text_block_count += 1;
            w.raw(r#"{"type":"text","bbox":"#)?;
            w.rect_int(&block.bbox)?;
            w.raw(r#","lines":["#)?;
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    w.raw(",")?;
                }
                write_line(w, page, line, stats)?;
            }
            w.raw("]}")
        }
        BlockKind::Image(image) => {
            stats.image_count += 1;
            w.raw(r#"{"type":"image","bbox":"#)?;
            w.rect_int(&block.bbox)?;
            if settings.include_image_data {
                write_image_data(w, image.as_ref(), block, settings, stats)?;
            }
            w.raw("}")
        }
        // Anything else degrades to a stub instead of failing the page
        _ => {
            stats.other_block_count += 1;
            w.raw(r#"{"type":"other"}"#)
        }
    }
}

fn write_image_data(
    w: &mut JsonWriter,
    image: &dyn ImageSource,
    block: &StextBlock,
    settings: BlockSettings,
    stats: &mut ExtractionStats,
) -> Result<()> {
    match encode(image, &block.bbox, settings.max_image_area) {
        ImagePayload::Data(base64) => {
            stats.images_encoded += 1;
            w.raw(r#","data":"#)?;
            w.quoted(&base64)
        }
        ImagePayload::Failed => {
            stats.images_failed += 1;
            w.raw(r#","data":null"#)
        }
        ImagePayload::TooLarge => {
            stats.images_too_large += 1;
            w.raw(r#","data":null,"error":"#)?;
            w.string(IMAGE_TOO_LARGE)
        }
    }
}

/// Write one line object; `font` is present only when the line has characters.
pub fn write_line(
    w: &mut JsonWriter,
    page: &StextPage,
    line: &StextLine,
    stats: &mut ExtractionStats,
) -> Result<()> {
    stats.line_count += 1;
    stats.char_count += line.chars.len() as u32;

    w.raw(r#"{"bbox":"#)?;
    w.rect_g(&line.bbox)?;
    w.raw(",")?;

    if let Some(font) = line_font(page, line) {
        w.raw(r#""font":{"name":"#)?;
        w.string(font.name)?;
        w.raw(r#","family":"#)?;
        w.string(font.family.as_str())?;
        w.raw(r#","weight":"#)?;
        w.string(font.weight.as_str())?;
        w.raw(r#","style":"#)?;
        w.string(font.style.as_str())?;
        w.raw(r#","size":"#)?;
        w.int(i64::from(font.size))?;
        w.raw(r#","x":"#)?;
        w.int(i64::from(font.x))?;
        w.raw(r#","y":"#)?;
        w.int(i64::from(font.y))?;
        w.raw("},")?;
    }

    let mut text = String::new();
    escape_code_points(line.chars.iter().map(|ch| ch.c), &mut text);
    w.raw(r#""text":"#)?;
    w.quoted(&text)?;
    w.raw("}")
}
