//! C-ABI FFI bindings for cross-language integration.
//!
//! Strings returned by [`pagejson_extract_page_json`] are owned by the
//! caller and must be released with [`pagejson_free_string`] exactly once.
//! Failures return a sentinel (null or -1) and record a message that
//! [`pagejson_get_last_error`] reads back on the same thread.

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr;

use crate::engine::{count_pages_with, LopdfEngine};
use crate::error::{Error, Result};
use crate::render::{extract_page_json_with, ExtractOptions};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(err: &Error) {
    let message = err.to_string().replace('\0', " ");
    let message = CString::new(message).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Read a caller path, treating null like an empty path.
///
/// # Safety
///
/// `path` must be null or a valid null-terminated string.
unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a str> {
    if path.is_null() {
        return Ok("");
    }
    CStr::from_ptr(path)
        .to_str()
        .map_err(|_| Error::InvalidInput("Invalid UTF-8 path".to_string()))
}

/// Get the page count of a PDF file.
///
/// # Safety
///
/// The `path` must be null or a valid null-terminated UTF-8 string.
/// Returns -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pagejson_count_pages(path: *const c_char) -> i32 {
    let result = path_arg(path).and_then(|p| count_pages_with(&LopdfEngine::new(), Path::new(p)));
    match result {
        Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Serialize one page (1-based) of a PDF file to JSON.
///
/// # Safety
///
/// The `path` must be null or a valid null-terminated UTF-8 string.
/// A non-null result must be freed with `pagejson_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pagejson_extract_page_json(
    path: *const c_char,
    page_number: i32,
    include_image_data: bool,
) -> *mut c_char {
    match extract_internal(path, page_number, include_image_data) {
        Ok(json) => json.into_raw(),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

unsafe fn extract_internal(
    path: *const c_char,
    page_number: i32,
    include_image_data: bool,
) -> Result<CString> {
    let path = path_arg(path)?;
    // Negative numbers become 0 and fail the range check like any other
    let page = u32::try_from(page_number).unwrap_or(0);
    let options = ExtractOptions::new().with_image_data(include_image_data);
    let json = extract_page_json_with(&LopdfEngine::new(), Path::new(path), page, &options)?;
    CString::new(json).map_err(|e| Error::Other(e.to_string()))
}

/// Get the last error recorded on the calling thread.
///
/// Returns null if no call on this thread has failed yet. The pointer stays
/// valid until the next failing call on the same thread and must not be freed.
#[no_mangle]
pub extern "C" fn pagejson_get_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a string returned by pagejson.
///
/// # Safety
///
/// The `ptr` must have been returned by a pagejson function.
/// This function should only be called once per pointer.
#[no_mangle]
pub unsafe extern "C" fn pagejson_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the version of the pagejson library.
///
/// The returned string is statically allocated and should not be freed.
#[no_mangle]
pub extern "C" fn pagejson_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error() -> Option<String> {
        let ptr = pagejson_get_last_error();
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
        }
    }

    fn one_page_pdf() -> tempfile::NamedTempFile {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("ffi")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        doc.save(file.path()).unwrap();
        file
    }

    #[test]
    fn test_extract_and_free() {
        let file = one_page_pdf();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();

        let json = unsafe { pagejson_extract_page_json(path.as_ptr(), 1, false) };
        assert!(!json.is_null());
        let text = unsafe { CStr::from_ptr(json) }.to_str().unwrap().to_string();
        unsafe { pagejson_free_string(json) };

        let expected = crate::extract_page_json(file.path(), 1, false).unwrap();
        assert_eq!(text, expected);
        assert!(text.contains(r#""text":"ffi""#));

        assert_eq!(unsafe { pagejson_count_pages(path.as_ptr()) }, 1);
    }

    #[test]
    fn test_negative_page_is_out_of_range() {
        let file = one_page_pdf();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();

        let json = unsafe { pagejson_extract_page_json(path.as_ptr(), -3, false) };
        assert!(json.is_null());
        assert!(last_error().unwrap().starts_with("Failed to extract page 0 from "));
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(pagejson_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_null_path_sets_last_error() {
        let json = unsafe { pagejson_extract_page_json(ptr::null(), 1, false) };
        assert!(json.is_null());
        assert_eq!(last_error().as_deref(), Some("Invalid PDF path filename is empty"));
    }

    #[test]
    fn test_missing_file() {
        let path = CString::new("missing-file.pdf").unwrap();
        let json = unsafe { pagejson_extract_page_json(path.as_ptr(), 2, true) };
        assert!(json.is_null());
        assert!(last_error()
            .unwrap()
            .starts_with("Failed to extract page 2 from missing-file.pdf"));

        assert_eq!(unsafe { pagejson_count_pages(path.as_ptr()) }, -1);
    }

    #[test]
    fn test_last_error_is_per_thread() {
        unsafe { pagejson_extract_page_json(ptr::null(), 1, false) };
        assert!(last_error().is_some());

        let other = std::thread::spawn(last_error).join().unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_free_null_is_noop() {
        unsafe { pagejson_free_string(ptr::null_mut()) };
    }
}
