//! Extraction options and configuration.

use std::ops::RangeInclusive;

use super::image::MAX_IMAGE_AREA;

/// Options for serializing pages to JSON.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Inline image blocks as base64 PNG
    pub include_image_data: bool,

    /// Largest image bounding-box area that is inlined
    pub max_image_area: i64,

    /// Output layout
    pub format: JsonFormat,

    /// Pages serialized by document extraction
    pub pages: PageSelection,

    /// Serialize pages of a document on the rayon pool
    pub parallel: bool,

    /// Initial size of the output buffer in bytes
    pub initial_capacity: usize,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable inline image data.
    pub fn with_image_data(mut self, include: bool) -> Self {
        self.include_image_data = include;
        self
    }

    /// Set the image area budget.
    pub fn with_max_image_area(mut self, area: i64) -> Self {
        self.max_image_area = area;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: JsonFormat) -> Self {
        self.format = format;
        self
    }

    /// Pretty-print the output.
    pub fn pretty(self) -> Self {
        self.with_format(JsonFormat::Pretty)
    }

    /// Set page selection.
    pub fn with_pages(mut self, selection: PageSelection) -> Self {
        self.pages = selection;
        self
    }

    /// Set specific page range.
    pub fn with_page_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.pages = PageSelection::Range(range);
        self
    }

    /// Enable or disable parallel document extraction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel document extraction.
    pub fn sequential(self) -> Self {
        self.with_parallel(false)
    }

    /// Set the initial output buffer size.
    pub fn with_initial_capacity(mut self, bytes: usize) -> Self {
        self.initial_capacity = bytes;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_image_data: false,
            max_image_area: MAX_IMAGE_AREA,
            format: JsonFormat::Compact,
            pages: PageSelection::All,
            parallel: true,
            initial_capacity: 1024,
        }
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Single line, byte-exact wire format
    #[default]
    Compact,
    /// Indented for reading
    Pretty,
}

/// Page selection for document extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Selected page numbers of a document with `page_count` pages, ascending.
    pub fn resolve(&self, page_count: u32) -> Vec<u32> {
        (1..=page_count).filter(|p| self.includes(*p)).collect()
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let page = |t: &str| -> Result<u32, String> {
            match t.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("Invalid page number: {}", t.trim())),
                Ok(p) => Ok(p),
            }
        };

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                return Ok(PageSelection::Range(page(start)?..=page(end)?));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(page(start)?..=page(end)?),
                None => pages.push(page(part)?),
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
