//! # pagejson
//!
//! Per-page JSON extraction of PDF structured text for Rust.
//!
//! A page is run through a rendering engine into a structured text model
//! (blocks, lines, characters, fonts, images) and serialized to a compact,
//! byte-stable JSON document.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> pagejson::Result<()> {
//!     let pages = pagejson::count_pages("document.pdf")?;
//!     for n in 1..=pages {
//!         let json = pagejson::extract_page_json("document.pdf", n, false)?;
//!         println!("Page {} JSON:\n{}", n, json);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Output
//!
//! ```text
//! {"blocks":[
//!   {"type":"text","bbox":[x0,y0,x1,y1],"lines":[
//!     {"bbox":[x0,y0,x1,y1],
//!      "font":{"name":"..","family":"..","weight":"..","style":"..","size":N,"x":N,"y":N},
//!      "text":".."}]},
//!   {"type":"image","bbox":[x0,y0,x1,y1],"data":"<base64 png>"},
//!   {"type":"other"}
//! ]}
//! ```
//!
//! ## Features
//!
//! - **Byte-stable output**: fixed key order and numeric formatting
//! - **Font classification**: family, weight and style per line
//! - **Inline images**: optional base64 PNG with an area guard
//! - **Parallel processing**: Uses Rayon for whole-document extraction
//! - **C ABI**: enable the `ffi` feature for the `pagejson_*` functions

pub mod detect;
pub mod engine;
pub mod error;
pub mod model;
pub mod render;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use engine::{
    DocumentHandle, LopdfDocument, LopdfEngine, LopdfPage, PageHandle, RenderEngine, StextOptions,
};
pub use error::{Error, Result};
pub use model::{
    BlockKind, Font, FontId, FontQuery, FontTable, ImageSource, Rect, StextBlock, StextChar,
    StextLine, StextPage,
};
pub use render::{
    extract_document, extract_page, extract_page_json_with, ExtractOptions, ExtractionStats,
    JsonFormat, PageJson, PageOutcome, PageSelection,
};

use std::path::Path;

/// Serialize one page of a PDF file to JSON.
///
/// `page_number` is 1-based. With `include_image_data` every image block
/// carries its pixels as a base64 PNG, subject to the default area guard.
///
/// # Example
///
/// ```no_run
/// let json = pagejson::extract_page_json("document.pdf", 1, false).unwrap();
/// assert!(json.starts_with(r#"{"blocks":["#));
/// ```
pub fn extract_page_json<P: AsRef<Path>>(
    path: P,
    page_number: u32,
    include_image_data: bool,
) -> Result<String> {
    let options = ExtractOptions::new().with_image_data(include_image_data);
    extract_page_json_with(&LopdfEngine::new(), path.as_ref(), page_number, &options)
}

/// Count the pages of a PDF file.
///
/// # Example
///
/// ```no_run
/// let pages = pagejson::count_pages("document.pdf").unwrap();
/// println!("Pages: {}", pages);
/// ```
pub fn count_pages<P: AsRef<Path>>(path: P) -> Result<u32> {
    engine::count_pages_with(&LopdfEngine::new(), path.as_ref())
}

/// Builder for extracting pages with custom options.
///
/// # Example
///
/// ```no_run
/// use pagejson::Extractor;
///
/// let page = Extractor::new()
///     .with_images(true)
///     .with_max_image_area(1024 * 1024)
///     .pretty()
///     .page("document.pdf", 1)?;
/// println!("{} blocks", page.stats.block_count());
/// # Ok::<(), pagejson::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    engine: LopdfEngine,
    options: ExtractOptions,
}

impl Extractor {
    /// Create a new extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline image pixels as base64 PNG.
    pub fn with_images(mut self, include: bool) -> Self {
        self.options = self.options.with_image_data(include);
        self
    }

    /// Set the largest image area that is inlined.
    pub fn with_max_image_area(mut self, area: i64) -> Self {
        self.options = self.options.with_max_image_area(area);
        self
    }

    /// Pretty-print the output.
    pub fn pretty(mut self) -> Self {
        self.options = self.options.pretty();
        self
    }

    /// Set page selection for [`Extractor::document`].
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// The options this extractor runs with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Serialize one page of a file.
    pub fn page<P: AsRef<Path>>(&self, path: P, page_number: u32) -> Result<PageJson> {
        extract_page(&self.engine, path.as_ref(), page_number, &self.options)
    }

    /// Serialize one page of a PDF held in memory.
    pub fn page_from_bytes(&self, data: &[u8], page_number: u32) -> Result<PageJson> {
        let document = LopdfDocument::from_bytes(data)?;
        render::serialize_page(&document, page_number, &self.options)
    }

    /// Serialize the selected pages of a file, each in its own failure domain.
    pub fn document<P: AsRef<Path>>(&self, path: P) -> Result<Vec<PageOutcome>> {
        extract_document(&self.engine, path.as_ref(), &self.options)
    }
}
