//! Data produced by an extraction run.
//!
//! [`ImageRecord`] is the unit the classifier works on; everything else here
//! describes the document it came from and the files written for the report.

use crate::classify::Classification;
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Format tag used when the encoder did not report one.
pub const UNKNOWN_FORMAT: &str = "unknown";

fn unknown_format() -> String {
    UNKNOWN_FORMAT.to_string()
}

/// Position of an image within its page.
///
/// Serialises as a bare number for embedded images and as the string
/// `"screenshot"` for the page-level render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageIndex {
    /// Nth image object on the page, 0-based.
    Ordinal(usize),
    /// The rendered page itself.
    Page(PageLevel),
}

/// Sentinel carried by [`ImageIndex::Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLevel {
    Screenshot,
}

impl ImageIndex {
    pub const SCREENSHOT: ImageIndex = ImageIndex::Page(PageLevel::Screenshot);

    pub fn is_screenshot(&self) -> bool {
        matches!(self, ImageIndex::Page(_))
    }
}

impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageIndex::Ordinal(n) => write!(f, "{n}"),
            ImageIndex::Page(PageLevel::Screenshot) => f.write_str("screenshot"),
        }
    }
}

/// One extracted image slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// File name under `images/`. `None` marks a slot whose extraction failed.
    pub filename: Option<String>,
    /// 1-based page number.
    pub page: usize,
    pub index: ImageIndex,
    /// Pixel width, `0` when unknown.
    #[serde(default)]
    pub width: u32,
    /// Pixel height, `0` when unknown.
    #[serde(default)]
    pub height: u32,
    /// Encoded size in bytes, `0` when unknown.
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default = "unknown_format")]
    pub format: String,
    /// Content-derived identifier. Filled in by classification when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Why extraction failed, for unnamed slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageRecord {
    /// A successfully extracted image.
    pub fn new(
        filename: impl Into<String>,
        page: usize,
        index: usize,
        width: u32,
        height: u32,
        size_bytes: u64,
        format: impl Into<String>,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            page,
            index: ImageIndex::Ordinal(index),
            width,
            height,
            size_bytes,
            format: format.into(),
            content_hash: None,
            error: None,
        }
    }

    /// A slot whose extraction failed.
    pub fn failed(page: usize, index: usize, error: impl Into<String>) -> Self {
        Self {
            filename: None,
            page,
            index: ImageIndex::Ordinal(index),
            width: 0,
            height: 0,
            size_bytes: 0,
            format: unknown_format(),
            content_hash: None,
            error: Some(error.into()),
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Whether extraction produced a file for this slot.
    pub fn is_extracted(&self) -> bool {
        self.filename.is_some()
    }

    /// `(page, index)`, unique per record within a document.
    pub fn key(&self) -> (usize, ImageIndex) {
        (self.page, self.index)
    }

    /// Pixel area, computed wide so large scans cannot overflow.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Stable DOM id used by the report, e.g. `3_0` or `page_3_screenshot`.
    pub fn element_id(&self) -> String {
        match self.index {
            ImageIndex::Ordinal(n) => format!("{}_{}", self.page, n),
            ImageIndex::Page(_) => format!("page_{}_screenshot", self.page),
        }
    }
}

/// Document-level metadata read from the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}

/// One extracted page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based.
    pub page_number: usize,
    pub text: String,
    /// Image slots found on the page, failed ones included.
    pub image_count: usize,
    /// Screenshot file name under `images/`.
    pub screenshot: Option<String>,
    /// Page size in PDF points.
    pub dimensions: Option<PageDimensions>,
    /// Positioned runs of text in reading order.
    #[serde(default)]
    pub text_blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

/// A run of text sharing one baseline and style, as pdfium segments it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// `[left, bottom, right, top]` in PDF points, origin at the bottom-left
    /// corner of the page.
    pub bbox: [f32; 4],
    /// Font of the first visible character.
    pub font: Option<String>,
    /// Scaled font size in points.
    pub size: Option<f32>,
}

/// Everything pulled out of the PDF, before classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Input file name, e.g. `report.pdf`.
    pub filename: String,
    /// Total pages in the PDF, selected or not.
    pub page_count: usize,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageRecord>,
    /// All image slots in page order.
    pub images: Vec<ImageRecord>,
    pub errors: Vec<PageError>,
    /// RFC 3339 timestamp of the run.
    pub extracted_at: String,
}

impl ExtractedDocument {
    /// Concatenated page text, pages separated by a blank line.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for page in &self.pages {
            text.push_str(&page.text);
            text.push_str("\n\n");
        }
        text
    }

    /// Images belonging to one page, in extraction order.
    pub fn page_images(&self, page_number: usize) -> Vec<ImageRecord> {
        self.images
            .iter()
            .filter(|img| img.page == page_number)
            .cloned()
            .collect()
    }
}

/// VLM description of one unique image, shared by its duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescription {
    pub page: usize,
    pub index: ImageIndex,
    pub filename: String,
    pub content_hash: Option<String>,
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u32,
}

/// Paths of the files written for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFiles {
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    pub html: PathBuf,
    pub data_json: PathBuf,
    pub pages_json: PathBuf,
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DissectStats {
    pub total_pages: usize,
    pub extracted_pages: usize,
    pub failed_pages: usize,
    pub total_images: usize,
    pub failed_images: usize,
    pub unique_images: usize,
    pub duplicate_images: usize,
    pub small_images: usize,
    pub regular_images: usize,
    pub described_images: usize,
    pub extract_duration_ms: u64,
    pub describe_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of [`crate::dissect()`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissectOutput {
    pub document: ExtractedDocument,
    pub classification: Classification,
    pub descriptions: Vec<ImageDescription>,
    pub report: ReportFiles,
    pub stats: DissectStats,
}
