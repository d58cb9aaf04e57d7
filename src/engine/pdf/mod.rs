//! Rendering engine backed by lopdf.
//!
//! lopdf gives us the object graph and content-stream tokenizer; the
//! interpreter in this module plays the content stream into a structured
//! text builder, producing the block/line/character model the serializer
//! consumes.

mod builder;
mod fonts;
mod image;
mod interpreter;

pub use image::PdfImage;

use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document as PdfDocument, Object, ObjectId};

use super::{DocumentHandle, PageHandle, RenderEngine, StextOptions};
use crate::detect::detect_format_from_path;
use crate::error::{Error, Result};
use crate::model::{Matrix, Rect, StextPage};
use interpreter::Interpreter;

/// Limit on `/Parent` hops when looking up inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Concrete [`RenderEngine`] backed by `lopdf::Document`.
#[derive(Debug, Clone, Default)]
pub struct LopdfEngine {
    _private: (),
}

impl LopdfEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl RenderEngine for LopdfEngine {
    type Document = LopdfDocument;

    fn open_document(&self, path: &Path) -> Result<LopdfDocument> {
        LopdfDocument::open(path)
    }
}

/// Parsed document plus its page list, shared by the page handles.
struct LoadedPdf {
    doc: PdfDocument,
    pages: Vec<ObjectId>,
}

/// An open PDF document.
pub struct LopdfDocument {
    pdf: Arc<LoadedPdf>,
    label: String,
}

impl LopdfDocument {
    /// Open a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidInput(
                "Invalid PDF path filename is empty".to_string(),
            ));
        }

        detect_format_from_path(path)?;

        let doc = PdfDocument::load(path)?;

        Ok(Self::from_document(doc, path.display().to_string()))
    }

    /// Open a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        crate::detect::detect_format_from_bytes(data)?;

        let doc = PdfDocument::load_mem(data)?;

        Ok(Self::from_document(doc, "<memory>".to_string()))
    }

    fn from_document(doc: PdfDocument, label: String) -> Self {
        if doc.is_encrypted() {
            log::warn!("{} is encrypted; text may not decode", label);
        }
        let pages = doc.get_pages().into_values().collect();
        Self {
            pdf: Arc::new(LoadedPdf { doc, pages }),
            label,
        }
    }

    /// PDF version string from the file header.
    pub fn version(&self) -> String {
        self.pdf.doc.version.to_string()
    }
}

impl Drop for LopdfDocument {
    fn drop(&mut self) {
        log::trace!("closed document {}", self.label);
    }
}

impl DocumentHandle for LopdfDocument {
    type Page = LopdfPage;

    fn page_count(&self) -> Result<u32> {
        Ok(self.pdf.pages.len() as u32)
    }

    fn load_page(&self, index: u32) -> Result<LopdfPage> {
        let count = self.pdf.pages.len() as u32;
        let id = *self
            .pdf
            .pages
            .get(index as usize)
            .ok_or(Error::PageOutOfRange(index.saturating_add(1), count))?;

        let page_dict = self.pdf.doc.get_dictionary(id)?;
        let media_box = inherited(&self.pdf.doc, page_dict, b"MediaBox")
            .and_then(|o| rect_from_object(&self.pdf.doc, o))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(Rect::letter);

        log::trace!("loaded page {} of {}", index + 1, self.label);
        Ok(LopdfPage {
            pdf: Arc::clone(&self.pdf),
            id,
            number: index + 1,
            media_box,
        })
    }
}

/// A loaded page; keeps its document alive.
pub struct LopdfPage {
    pdf: Arc<LoadedPdf>,
    id: ObjectId,
    number: u32,
    /// Media box in PDF user space (y up).
    media_box: Rect,
}

impl LopdfPage {
    /// 1-based page number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Maps PDF user space to page space (origin top-left, y down).
    fn base_matrix(&self) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, -1.0, -self.media_box.x0, self.media_box.y1)
    }
}

impl Drop for LopdfPage {
    fn drop(&mut self) {
        log::trace!("released page {}", self.number);
    }
}

impl PageHandle for LopdfPage {
    fn bound(&self) -> Rect {
        Rect::new(0.0, 0.0, self.media_box.width(), self.media_box.height())
    }

    fn to_structured_text(&self, mediabox: Rect, options: &StextOptions) -> Result<StextPage> {
        let doc = &self.pdf.doc;
        let page_dict = doc.get_dictionary(self.id)?;
        let content = page_content(doc, page_dict)?;
        let resources = inherited(doc, page_dict, b"Resources").and_then(|o| o.as_dict().ok());

        let mut interpreter = Interpreter::new(doc, mediabox, *options);
        interpreter.run(&content, resources, self.base_matrix())?;
        let page = interpreter.finish();

        log::debug!(
            "page {}: {} blocks, {} fonts",
            self.number,
            page.blocks.len(),
            page.fonts.len()
        );
        Ok(page)
    }
}

/// Follow a reference to the object it names; other objects are returned as is.
pub(crate) fn resolve<'a>(doc: &'a PdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to extract a number from a PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree if needed.
fn inherited<'a>(doc: &'a PdfDocument, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        node = node
            .get(b"Parent")
            .ok()
            .and_then(|p| resolve(doc, p).as_dict().ok())?;
    }
    None
}

fn rect_from_object(doc: &PdfDocument, obj: &Object) -> Option<Rect> {
    let arr = obj.as_array().ok()?;
    if arr.len() < 4 {
        return None;
    }
    let n = |i: usize| get_number(resolve(doc, &arr[i]));
    let (x0, y0, x1, y1) = (n(0)?, n(1)?, n(2)?, n(3)?);
    Some(Rect::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
}

/// Get the decoded page content stream; a page without `/Contents` is blank.
fn page_content(doc: &PdfDocument, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents) {
        Object::Stream(s) => stream_data(s),
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Stream(s) = resolve(doc, obj) {
                    content.extend_from_slice(&stream_data(s)?);
                    content.push(b' ');
                }
            }
            Ok(content)
        }
        _ => Err(Error::Render("Invalid content stream".to_string())),
    }
}

/// Stream bytes with filters applied; unfiltered streams are returned as is.
pub(crate) fn stream_data(stream: &lopdf::Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::Render(format!("cannot decode stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_get_number() {
        assert_eq!(get_number(&Object::Integer(42)), Some(42.0));
        assert_eq!(get_number(&Object::Real(2.5)), Some(2.5));
        assert_eq!(get_number(&Object::Null), None);
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = PdfDocument::with_version("1.5");
        let parent_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => parent_id,
        };

        let rect = inherited(&doc, &page, b"MediaBox").and_then(|o| rect_from_object(&doc, o));
        assert_eq!(rect, Some(Rect::new(0.0, 0.0, 595.0, 842.0)));
        assert!(inherited(&doc, &page, b"Rotate").is_none());
    }

    #[test]
    fn test_rect_from_object_normalizes() {
        let doc = PdfDocument::with_version("1.5");
        let obj = Object::Array(vec![100.into(), 200.into(), 0.into(), 0.into()]);
        assert_eq!(rect_from_object(&doc, &obj), Some(Rect::new(0.0, 0.0, 100.0, 200.0)));
        assert_eq!(rect_from_object(&doc, &Object::Array(vec![1.into()])), None);
    }

    #[test]
    fn test_page_without_contents_is_blank() {
        let doc = PdfDocument::with_version("1.5");
        let page = dictionary! { "Type" => "Page" };
        assert!(page_content(&doc, &page).unwrap().is_empty());
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = LopdfDocument::open(Path::new("")).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_loaded_page_numbers_and_version() {
        let mut doc = PdfDocument::with_version("1.6");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..2)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let document = LopdfDocument::from_bytes(&bytes).unwrap();
        assert_eq!(document.version(), "1.6");
        assert_eq!(document.page_count().unwrap(), 2);

        let page = document.load_page(1).unwrap();
        assert_eq!(page.number(), 2);
        assert_eq!(page.bound(), Rect::letter());
        assert!(matches!(
            document.load_page(2),
            Err(Error::PageOutOfRange(3, 2))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_non_pdf() {
        assert!(matches!(
            LopdfDocument::from_bytes(b"hello world"),
            Err(Error::UnknownFormat)
        ));
    }
}
