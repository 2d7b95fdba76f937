//! Error types for the pdf-dissect library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DissectError`]: **Fatal**: the run cannot proceed at all (bad input
//!   file, wrong password, report directory not writable). Returned as
//!   `Err(DissectError)` from the top-level `dissect*` functions.
//!
//! * [`PageError`]: **Non-fatal**: one page, image slot, screenshot or
//!   description failed but everything else is fine. Collected in
//!   [`crate::output::ExtractedDocument::errors`] so the report can show
//!   partial results.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-dissect library.
#[derive(Debug, Error)]
pub enum DissectError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// Image descriptions were requested but no provider could be built.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the report directory or one of its files.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON sidecar could not be serialised.
    #[error("Failed to serialise '{path}': {source}")]
    SerializeFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium next to the binary or system-wide, or set\n\
PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page, image slot or description.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page could not be loaded; it is missing from the report.
    #[error("Page {page}: extraction failed: {detail}")]
    PageFailed { page: usize, detail: String },

    /// Text extraction failed; the page is kept with empty text.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextFailed { page: usize, detail: String },

    /// One image slot could not be decoded, encoded or written.
    #[error("Page {page}: image {index} extraction failed: {detail}")]
    ImageFailed {
        page: usize,
        index: usize,
        detail: String,
    },

    /// Page screenshot rendering failed.
    #[error("Page {page}: screenshot failed: {detail}")]
    ScreenshotFailed { page: usize, detail: String },

    /// The VLM description call failed after retries.
    #[error("Page {page}: description of '{filename}' failed after {retries} retries: {detail}")]
    DescribeFailed {
        page: usize,
        filename: String,
        retries: u32,
        detail: String,
    },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::PageFailed { page, .. }
            | PageError::TextFailed { page, .. }
            | PageError::ImageFailed { page, .. }
            | PageError::ScreenshotFailed { page, .. }
            | PageError::DescribeFailed { page, .. } => *page,
        }
    }
}
