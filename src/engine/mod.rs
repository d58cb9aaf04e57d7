//! Rendering engine abstraction layer.
//!
//! Provides a trait-based interface for the operations the serializer needs
//! from a document engine (open, load page, bound, structured text), isolating
//! the concrete PDF library (lopdf) from the JSON pipeline.
//!
//! Handles are released by dropping them. The traits do not tie a page's
//! lifetime to its document; engines whose pages need the document alive keep
//! a shared reference to it inside the page handle.

mod pdf;

pub use pdf::{LopdfDocument, LopdfEngine, LopdfPage, PdfImage};

use std::path::Path;

use crate::error::Result;
use crate::model::{Rect, StextPage};

/// Options for structured text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StextOptions {
    /// Keep image blocks in the output model.
    pub preserve_images: bool,
    /// Keep whitespace characters as drawn instead of mapping them to U+0020.
    pub preserve_whitespace: bool,
}

impl StextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used by the page serializer: images are always kept.
    pub fn preserve_images() -> Self {
        Self {
            preserve_images: true,
            ..Self::default()
        }
    }

    pub fn with_preserve_whitespace(mut self, yes: bool) -> Self {
        self.preserve_whitespace = yes;
        self
    }
}

impl Default for StextOptions {
    fn default() -> Self {
        Self {
            preserve_images: false,
            preserve_whitespace: false,
        }
    }
}

/// Entry point of a rendering engine.
pub trait RenderEngine {
    type Document: DocumentHandle;

    /// Open a document. Dropping the handle closes it.
    fn open_document(&self, path: &Path) -> Result<Self::Document>;
}

/// An open document.
pub trait DocumentHandle {
    type Page: PageHandle;

    /// Number of pages in the document.
    fn page_count(&self) -> Result<u32>;

    /// Load a page by 0-based index. Dropping the handle releases it.
    fn load_page(&self, index: u32) -> Result<Self::Page>;
}

/// A loaded page.
pub trait PageHandle {
    /// The page rectangle in page space.
    fn bound(&self) -> Rect;

    /// Run the page through a structured text device clipped to `mediabox`.
    fn to_structured_text(&self, mediabox: Rect, options: &StextOptions) -> Result<StextPage>;
}

/// Open `path` with `engine` and return its page count.
pub fn count_pages_with<E: RenderEngine>(engine: &E, path: &Path) -> Result<u32> {
    let document = engine.open_document(path)?;
    document.page_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stext_options() {
        let opts = StextOptions::preserve_images();
        assert!(opts.preserve_images);
        assert!(!opts.preserve_whitespace);

        let opts = StextOptions::new().with_preserve_whitespace(true);
        assert!(!opts.preserve_images);
        assert!(opts.preserve_whitespace);
    }
}
