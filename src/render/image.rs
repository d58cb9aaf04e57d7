//! Inline image payloads: PNG bytes as base64, guarded by an area budget.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::model::{ImageSource, Rect};

/// Largest bounding-box area (4096 × 4096) whose image is inlined.
pub const MAX_IMAGE_AREA: i64 = 16_777_216;

/// Message attached to images refused by the area budget.
pub const IMAGE_TOO_LARGE: &str = "Image too large";

/// Outcome of encoding one image block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Base64 of a complete PNG file.
    Data(String),
    /// Encoding failed; only this block is affected.
    Failed,
    /// The bounding box is larger than the budget; nothing was encoded.
    TooLarge,
}

/// Area used by the budget: integer width times integer height of `bbox`.
pub fn guarded_area(bbox: &Rect) -> i64 {
    let w = bbox.width() as i32;
    let h = bbox.height() as i32;
    i64::from(w) * i64::from(h)
}

/// Encode `image` for inlining unless `bbox` exceeds `max_area`.
///
/// Encoding errors never propagate; the PNG buffer is dropped once its
/// base64 text has been produced.
pub fn encode(image: &dyn ImageSource, bbox: &Rect, max_area: i64) -> ImagePayload {
    let area = guarded_area(bbox);
    if area > max_area {
        log::warn!(
            "image {}x{} px refused: area {} exceeds {}",
            image.width(),
            image.height(),
            area,
            max_area
        );
        return ImagePayload::TooLarge;
    }

    match image.encode_png() {
        Ok(png) => ImagePayload::Data(STANDARD.encode(&png)),
        Err(e) => {
            log::warn!("image {}x{} px not encoded: {}", image.width(), image.height(), e);
            ImagePayload::Failed
        }
    }
}
