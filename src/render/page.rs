//! Page serialization: open, load, render, write, release.
//!
//! Every handle acquired here is a local owned value, so each exit path
//! (success, validation failure, or a failure halfway through) drops them
//! exactly once, in reverse order of acquisition: output buffer, structured
//! text, page, document.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::engine::{DocumentHandle, PageHandle, RenderEngine, StextOptions};
use crate::error::{Error, Result};

use super::block::{write_blocks, BlockSettings};
use super::options::{ExtractOptions, JsonFormat};
use super::result::{ExtractionStats, PageJson, PageOutcome};
use super::writer::JsonWriter;

/// Serialize one page of the document at `path` to JSON.
///
/// `page_number` is 1-based. Any failure after the path has been validated
/// is reported as [`Error::PageExtraction`] naming the page and document.
pub fn extract_page<E: RenderEngine>(
    engine: &E,
    path: &Path,
    page_number: u32,
    options: &ExtractOptions,
) -> Result<PageJson> {
    validate_path(path)?;

    let document = engine
        .open_document(path)
        .map_err(|e| wrap(page_number, path, e))?;
    serialize_page(&document, page_number, options).map_err(|e| wrap(page_number, path, e))
}

/// Serialize one page and return only the JSON text.
pub fn extract_page_json_with<E: RenderEngine>(
    engine: &E,
    path: &Path,
    page_number: u32,
    options: &ExtractOptions,
) -> Result<String> {
    extract_page(engine, path, page_number, options).map(|page| page.json)
}

/// Serialize the selected pages of a document.
///
/// The document is opened once and its handle is shared by every page.
/// Each page is its own failure domain: a page that fails is reported in its
/// [`PageOutcome`] and the others still run. Opening the document is the only
/// failure that aborts the whole call, and it keeps its original variant.
pub fn extract_document<E>(
    engine: &E,
    path: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PageOutcome>>
where
    E: RenderEngine,
    E::Document: Sync,
{
    validate_path(path)?;

    let document = engine.open_document(path)?;
    let page_count = document.page_count()?;
    let pages = options.pages.resolve(page_count);
    log::debug!(
        "extracting {} of {} pages from {}",
        pages.len(),
        page_count,
        path.display()
    );

    let outcomes = if options.parallel {
        pages
            .par_iter()
            .map(|&page| outcome(&document, path, page, options))
            .collect()
    } else {
        pages
            .iter()
            .map(|&page| outcome(&document, path, page, options))
            .collect()
    };

    Ok(outcomes)
}

fn outcome<D: DocumentHandle>(
    document: &D,
    path: &Path,
    page: u32,
    options: &ExtractOptions,
) -> PageOutcome {
    PageOutcome {
        page,
        result: serialize_page(document, page, options).map_err(|e| wrap(page, path, e)),
    }
}

/// Load, render and write one page of an open document.
pub(crate) fn serialize_page<D: DocumentHandle>(
    document: &D,
    page_number: u32,
    options: &ExtractOptions,
) -> Result<PageJson> {
    let started = Instant::now();

    let page_count = document.page_count()?;
    if page_number == 0 || page_number > page_count {
        return Err(Error::PageOutOfRange(page_number, page_count));
    }

    let page = document.load_page(page_number - 1)?;
    let mediabox = page.bound();
    let stext = page.to_structured_text(mediabox, &StextOptions::preserve_images())?;

    let mut stats = ExtractionStats {
        page_count: 1,
        ..Default::default()
    };
    let settings = BlockSettings {
        include_image_data: options.include_image_data,
        max_image_area: options.max_image_area,
    };

    let mut out = JsonWriter::with_capacity(options.initial_capacity)?;
    out.raw(r#"{"blocks":["#)?;
    write_blocks(&mut out, &stext, settings, &mut stats)?;
    out.raw("]}")?;
    stats.output_bytes = out.len() as u64;

    let json = match options.format {
        JsonFormat::Compact => out.into_string()?,
        JsonFormat::Pretty => pretty(&out.into_string()?)?,
    };

    log::debug!(
        "page {}: {} blocks, {} bytes in {:?}",
        page_number,
        stats.block_count(),
        stats.output_bytes,
        started.elapsed()
    );

    Ok(PageJson {
        page: page_number,
        json,
        stats,
    })
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidInput(
            "Invalid PDF path filename is empty".to_string(),
        ));
    }
    Ok(())
}

fn wrap(page: u32, path: &Path, source: Error) -> Error {
    Error::page_extraction(page, path.display().to_string(), source)
}

/// Re-indent a compact document, keeping key order.
fn pretty(json: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Error::Other(e.to_string()))?;
    serde_json::to_string_pretty(&value).map_err(|e| Error::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Font, Point, Rect, StextBlock, StextChar, StextLine, StextPage};
    use std::path::PathBuf;

    struct OnePage;

    struct Doc;

    struct Page;

    impl RenderEngine for OnePage {
        type Document = Doc;

        fn open_document(&self, path: &Path) -> Result<Doc> {
            if path.ends_with("missing.pdf") {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "No such file",
                )));
            }
            Ok(Doc)
        }
    }

    impl DocumentHandle for Doc {
        type Page = Page;

        fn page_count(&self) -> Result<u32> {
            Ok(1)
        }

        fn load_page(&self, _index: u32) -> Result<Page> {
            Ok(Page)
        }
    }

    impl PageHandle for Page {
        fn bound(&self) -> Rect {
            Rect::new(0.0, 0.0, 100.0, 50.0)
        }

        fn to_structured_text(&self, mediabox: Rect, options: &StextOptions) -> Result<StextPage> {
            assert!(options.preserve_images);
            let mut page = StextPage::new(mediabox);
            let f = page.fonts.add(Font::plain("Helvetica"));
            let line = StextLine::from_chars(vec![
                StextChar::new('H', Point::new(10.4, 20.9), 12.7, f),
                StextChar::new('i', Point::new(18.0, 20.9), 12.7, f),
            ]);
            page.push_block(StextBlock::text(mediabox, vec![line]));
            Ok(page)
        }
    }

    fn path() -> PathBuf {
        PathBuf::from("doc.pdf")
    }

    #[test]
    fn test_extract_page_envelope() {
        let page = extract_page(&OnePage, &path(), 1, &ExtractOptions::default()).unwrap();
        assert!(page.json.starts_with(r#"{"blocks":[{"type":"text","bbox":[0,0,100,50],"lines":[{"bbox":"#));
        assert!(page.json.contains(
            r#""font":{"name":"Helvetica","family":"sans-serif","weight":"normal","style":"normal","size":12,"x":10,"y":20},"text":"Hi"}"#
        ));
        assert!(page.json.ends_with("]}]}"));
        assert_eq!(page.stats.page_count, 1);
        assert_eq!(page.stats.output_bytes, page.json.len() as u64);
    }

    #[test]
    fn test_out_of_range_pages() {
        for n in [0, 2] {
            let err = extract_page(&OnePage, &path(), n, &ExtractOptions::default()).unwrap_err();
            assert!(matches!(err.root_cause(), Error::PageOutOfRange(p, 1) if *p == n));
            assert!(err.to_string().starts_with(&format!("Failed to extract page {} from doc.pdf", n)));
        }
    }

    #[test]
    fn test_open_failure_is_wrapped() {
        let err = extract_page(&OnePage, Path::new("missing.pdf"), 1, &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PageExtraction { page: 1, .. }));
        assert!(matches!(err.root_cause(), Error::Io(_)));
    }

    #[test]
    fn test_empty_path_is_invalid_input() {
        let err = extract_page(&OnePage, Path::new(""), 1, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid PDF path filename is empty");
    }

    #[test]
    fn test_initial_capacity_does_not_change_output() {
        let small = ExtractOptions::new().with_initial_capacity(0);
        let large = ExtractOptions::new().with_initial_capacity(1 << 16);
        let a = extract_page(&OnePage, &path(), 1, &small).unwrap();
        let b = extract_page(&OnePage, &path(), 1, &large).unwrap();
        assert_eq!(a.json, b.json);
    }

    #[test]
    fn test_pretty_keeps_key_order() {
        let opts = ExtractOptions::new().pretty();
        let json = extract_page_json_with(&OnePage, &path(), 1, &opts).unwrap();
        assert!(json.contains('\n'));
        let type_at = json.find("\"type\"").unwrap();
        let bbox_at = json.find("\"bbox\"").unwrap();
        assert!(type_at < bbox_at);
    }

    #[test]
    fn test_extract_document_isolates_pages() {
        let opts = ExtractOptions::new();
        let outcomes = extract_document(&OnePage, &path(), &opts).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_ok());

        let err = extract_document(&OnePage, Path::new("missing.pdf"), &opts).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
