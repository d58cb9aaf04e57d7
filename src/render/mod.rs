//! Rendering module: structured text to the JSON page format.
//!
//! The pieces are layered bottom-up: [`escape`] and [`writer`] produce
//! JSON text, [`font`] and [`image`] derive the per-line font object and
//! inline image payloads, [`block`] walks blocks and lines, and [`page`]
//! drives a rendering engine through one page with guaranteed release.

pub mod block;
pub mod escape;
pub mod font;
pub mod image;
mod options;
mod page;
mod result;
pub mod writer;

pub use block::{write_block, write_blocks, write_line, BlockSettings};
pub use escape::{escape_code_point, escape_code_points, escape_str};
pub use font::{classify, line_font, Family, LineFont, Style, Weight};
pub use image::{encode as encode_image, ImagePayload, IMAGE_TOO_LARGE, MAX_IMAGE_AREA};
pub use options::{ExtractOptions, JsonFormat, PageSelection};
pub use page::{extract_document, extract_page, extract_page_json_with};
pub use result::{ExtractionStats, PageJson, PageOutcome};
pub use writer::{format_g, truncate, JsonWriter};

pub(crate) use page::serialize_page;
