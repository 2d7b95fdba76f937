//! # pdf-dissect
//!
//! Take a PDF apart: page text, embedded images and page screenshots, with
//! duplicate and small-image classification and an HTML report to browse
//! the result.
//!
//! Documents built from templates repeat the same logo, header rule or
//! photo on every page. The classifier groups exact copies by content hash
//! and near-copies by metadata (dimensions, encoded size, format), and
//! splits off icons and decorations below a configurable pixel area, so the
//! report and the optional VLM descriptions only deal with images that
//! matter.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   text, images, screenshots via pdfium (spawn_blocking)
//!  ├─ 3. Classify  duplicate groups + small/regular split
//!  ├─ 4. Describe  optional VLM descriptions of unique regular images
//!  └─ 5. Report    HTML report + data/pages JSON sidecars
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_dissect::{dissect, DissectConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DissectConfig::default();
//!     let output = dissect("brochure.pdf", "out", &config).await?;
//!     println!("report: {}", output.report.html.display());
//!     eprintln!("{} images, {} unique",
//!         output.stats.total_images,
//!         output.stats.unique_images);
//!     Ok(())
//! }
//! ```
//!
//! Classification works on its own, without pdfium:
//!
//! ```rust
//! use pdf_dissect::{classify, ImageRecord};
//!
//! let images = vec![
//!     ImageRecord::new("logo_a.png", 1, 0, 300, 300, 9_000, "png").with_content_hash("logo"),
//!     ImageRecord::new("logo_b.png", 2, 0, 300, 300, 9_000, "png").with_content_hash("logo"),
//!     ImageRecord::new("bullet.png", 2, 1, 12, 12, 150, "png"),
//! ];
//! let c = classify(images, 256);
//! assert_eq!(c.duplicates.unique.len(), 2);
//! assert_eq!(c.duplicates.groups.len(), 1);
//! assert_eq!(c.sizes.small.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-dissect` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-dissect = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod config;
pub mod dissect;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod stats;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{
    are_similar, classify, classify_by_size, classify_duplicates, Classification,
    DuplicateClassification, DuplicateGroup, DuplicateStatus, MatchKind, SizeClassification,
};
pub use config::{DissectConfig, DissectConfigBuilder, PageSelection};
pub use dissect::{dissect, dissect_sync, inspect};
pub use error::{DissectError, PageError};
pub use output::{
    DissectOutput, DissectStats, DocumentMetadata, ExtractedDocument, ImageDescription,
    ImageIndex, ImageRecord, PageRecord, ReportFiles, TextBlock,
};
pub use progress::{DissectProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stats::ImageStats;
