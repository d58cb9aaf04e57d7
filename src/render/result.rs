//! Extraction results with statistics.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One serialized page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageJson {
    /// 1-based page number
    pub page: u32,

    /// The page document, `{"blocks":[...]}`
    pub json: String,

    /// What the page contained
    pub stats: ExtractionStats,
}

impl PageJson {
    /// Get the JSON length in bytes.
    pub fn len(&self) -> usize {
        self.json.len()
    }

    pub fn is_empty(&self) -> bool {
        self.json.is_empty()
    }
}

/// Result of one page of a document extraction.
#[derive(Debug)]
pub struct PageOutcome {
    /// 1-based page number
    pub page: u32,

    pub result: Result<PageJson, Error>,
}

impl PageOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Statistics collected while serializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total number of pages serialized
    pub page_count: u32,

    /// Number of text blocks
    pub text_block_count: u32,

    /// Number of lines in text blocks
    pub line_count: u32,

    /// Number of characters in lines
    pub char_count: u32,

    /// Number of image blocks
    pub image_count: u32,

    /// Images inlined as base64
    pub images_encoded: u32,

    /// Images whose encoding failed
    pub images_failed: u32,

    /// Images refused by the area budget
    pub images_too_large: u32,

    /// Blocks emitted as `other`
    pub other_block_count: u32,

    /// Size of the produced JSON
    pub output_bytes: u64,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of blocks of every kind.
    pub fn block_count(&self) -> u32 {
        self.text_block_count + self.image_count + self.other_block_count
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.page_count += other.page_count;
        self.text_block_count += other.text_block_count;
        self.line_count += other.line_count;
        self.char_count += other.char_count;
        self.image_count += other.image_count;
        self.images_encoded += other.images_encoded;
        self.images_failed += other.images_failed;
        self.images_too_large += other.images_too_large;
        self.other_block_count += other.other_block_count;
        self.output_bytes += other.output_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_stats_merge() {
        let mut stats1 = ExtractionStats {
            page_count: 1,
            text_block_count: 5,
            image_count: 2,
            ..Default::default()
        };

        let stats2 = ExtractionStats {
            page_count: 1,
            text_block_count: 3,
            other_block_count: 1,
            images_too_large: 1,
            ..Default::default()
        };

        stats1.merge(&stats2);

        assert_eq!(stats1.page_count, 2);
        assert_eq!(stats1.text_block_count, 8);
        assert_eq!(stats1.images_too_large, 1);
        assert_eq!(stats1.block_count(), 11);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ExtractionStats {
            line_count: 4,
            ..Default::default()
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["line_count"], 4);
        assert_eq!(value["images_failed"], 0);
    }
}
