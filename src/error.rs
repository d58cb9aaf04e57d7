//! Error types for pagejson library.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Result type alias for pagejson operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while turning a page into JSON.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A caller-supplied argument was rejected before any work started.
    #[error("{0}")]
    InvalidInput(String),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Structured text extraction failed for a loaded page.
    #[error("Rendering error: {0}")]
    Render(String),

    /// An embedded image could not be turned into PNG bytes.
    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    /// The output buffer could not be grown.
    #[error("Allocation failure: {0}")]
    Allocation(String),

    /// A page-level failure, carrying the page and document it happened on.
    #[error("Failed to extract page {page} from {path}: {source}")]
    PageExtraction {
        /// 1-based page number as requested by the caller
        page: u32,
        /// Document path as given by the caller
        path: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a failure that happened while serializing `page` of `path`.
    pub fn page_extraction(page: u32, path: impl Into<String>, source: Error) -> Self {
        Error::PageExtraction {
            page,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping page-level wrapping.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::PageExtraction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<png::EncodingError> for Error {
    fn from(err: png::EncodingError) -> Self {
        Error::ImageEncode(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageEncode(err.to_string())
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::Allocation(err.to_string())
    }
}
