//! Report output: the HTML page and its two JSON sidecars.
//!
//! ```text
//! <out_dir>/
//! ├── <stem>_report.html   first chunk of pages inline, the rest on demand
//! ├── <stem>_pages.json    per-page entries the report loads in chunks
//! ├── <stem>_data.json     full extraction dump
//! └── images/              extracted images and page screenshots
//! ```
//!
//! Each file is written to a temp sibling first and renamed into place so a
//! crashed run never leaves a half-written report behind.

pub mod html;
pub mod sidecar;

use crate::classify::{Classification, DuplicateStatus, MatchKind};
use crate::error::DissectError;
use crate::output::{ExtractedDocument, ImageDescription, ImageIndex, ImageRecord, ReportFiles};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under the output dir holding every image file.
pub const IMAGES_DIR: &str = "images";

/// File layout for one document.
pub fn report_paths(out_dir: &Path, stem: &str) -> ReportFiles {
    ReportFiles {
        output_dir: out_dir.to_path_buf(),
        images_dir: out_dir.join(IMAGES_DIR),
        html: out_dir.join(format!("{stem}_report.html")),
        data_json: out_dir.join(format!("{stem}_data.json")),
        pages_json: out_dir.join(format!("{stem}_pages.json")),
    }
}

/// Duplicate badge shown on an image card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "lowercase")]
pub enum Badge {
    Unique,
    /// Representative or exact copy; count is the whole group.
    Duplicate(usize),
    /// Grouped by similarity; count is the whole group.
    Similar(usize),
}

impl Badge {
    pub fn for_status(status: DuplicateStatus) -> Option<Self> {
        match status {
            DuplicateStatus::Failed => None,
            DuplicateStatus::Unique => Some(Badge::Unique),
            DuplicateStatus::Grouped {
                kind: MatchKind::Similar,
                group_len,
            } => Some(Badge::Similar(group_len)),
            DuplicateStatus::Grouped { group_len, .. } => Some(Badge::Duplicate(group_len)),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Badge::Unique => "badge unique",
            Badge::Duplicate(_) => "badge dup",
            Badge::Similar(_) => "badge sim",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::Unique => f.write_str("UNIQUE"),
            Badge::Duplicate(n) => write!(f, "DUP {n}×"),
            Badge::Similar(n) => write!(f, "SIM {n}×"),
        }
    }
}

/// Everything the renderers look up while walking the pages.
pub struct ReportContext<'a> {
    pub document: &'a ExtractedDocument,
    pub classification: &'a Classification,
    pub pages_per_chunk: usize,
    pub text_preview_chars: usize,
    pub pages_json_name: String,
    descriptions: HashMap<(usize, ImageIndex), &'a ImageDescription>,
}

impl<'a> ReportContext<'a> {
    pub fn new(
        document: &'a ExtractedDocument,
        classification: &'a Classification,
        descriptions: &'a [ImageDescription],
        pages_per_chunk: usize,
        text_preview_chars: usize,
        pages_json_name: impl Into<String>,
    ) -> Self {
        Self {
            document,
            classification,
            pages_per_chunk: pages_per_chunk.max(1),
            text_preview_chars,
            pages_json_name: pages_json_name.into(),
            descriptions: descriptions.iter().map(|d| ((d.page, d.index), d)).collect(),
        }
    }

    /// Classified records of one page, failed slots included.
    pub fn page_images(&self, page_number: usize) -> Vec<&'a ImageRecord> {
        self.classification
            .images()
            .iter()
            .filter(|img| img.page == page_number)
            .collect()
    }

    pub fn badge(&self, image: &ImageRecord) -> Option<Badge> {
        Badge::for_status(self.classification.duplicates.status_of(image))
    }

    pub fn is_small(&self, image: &ImageRecord) -> bool {
        self.classification.is_small(image)
    }

    /// Description of the image's group representative.
    pub fn description(&self, image: &ImageRecord) -> Option<&'a ImageDescription> {
        let key = self.classification.duplicates.representative_key(image)?;
        self.descriptions.get(&key).copied()
    }

    pub fn unique_count(&self) -> usize {
        self.classification.duplicates.unique.len()
    }

    /// Extracted images that are not unique.
    pub fn duplicate_count(&self) -> usize {
        let extracted = self.classification.images().iter().filter(|i| i.is_extracted()).count();
        extracted - self.unique_count()
    }

    fn descriptions_sorted(&self) -> Vec<ImageDescription> {
        let mut all: Vec<ImageDescription> = self.descriptions.values().map(|d| (*d).clone()).collect();
        all.sort_by_key(|d| (d.page, d.index));
        all
    }
}

/// Write the HTML report and both sidecars.
pub async fn write_report(ctx: &ReportContext<'_>, files: &ReportFiles) -> Result<(), DissectError> {
    let data = sidecar::data_json(ctx.document, &ctx.descriptions_sorted())
        .map_err(|source| DissectError::SerializeFailed {
            path: files.data_json.clone(),
            source,
        })?;
    write_atomic(&files.data_json, data.as_bytes()).await?;

    let pages = sidecar::pages_json(ctx).map_err(|source| DissectError::SerializeFailed {
        path: files.pages_json.clone(),
        source,
    })?;
    write_atomic(&files.pages_json, pages.as_bytes()).await?;

    let report = html::render_report(ctx);
    write_atomic(&files.html, report.as_bytes()).await?;

    info!("Report written: {}", files.html.display());
    Ok(())
}

/// Write via a temp sibling and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DissectError> {
    let write_failed = |source| DissectError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_stem() {
        let files = report_paths(Path::new("/out"), "annual");
        assert_eq!(files.html, Path::new("/out/annual_report.html"));
        assert_eq!(files.data_json, Path::new("/out/annual_data.json"));
        assert_eq!(files.pages_json, Path::new("/out/annual_pages.json"));
        assert_eq!(files.images_dir, Path::new("/out/images"));
    }

    #[test]
    fn badge_labels() {
        assert_eq!(Badge::Unique.to_string(), "UNIQUE");
        assert_eq!(Badge::Duplicate(3).to_string(), "DUP 3×");
        assert_eq!(Badge::Similar(2).to_string(), "SIM 2×");
    }

    #[test]
    fn badge_from_status() {
        assert_eq!(Badge::for_status(DuplicateStatus::Failed), None);
        assert_eq!(
            Badge::for_status(DuplicateStatus::Grouped {
                kind: MatchKind::Original,
                group_len: 4
            }),
            Some(Badge::Duplicate(4))
        );
        assert_eq!(
            Badge::for_status(DuplicateStatus::Grouped {
                kind: MatchKind::Similar,
                group_len: 2
            }),
            Some(Badge::Similar(2))
        );
    }

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("/out/a_report.html")),
            Path::new("/out/a_report.html.tmp")
        );
    }

    #[tokio::test]
    async fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("x.json");
        write_atomic(&target, b"{}").await.expect("write");
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
        assert!(!tmp_sibling(&target).exists());
    }
}
