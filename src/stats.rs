//! Text and image statistics shown in the report.

use crate::output::ImageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rough LLM token estimate: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Human-readable byte size with one decimal, 1024-based.
pub fn format_bytes(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Collapse whitespace and cut to `max_chars`.
///
/// The cut moves back to the last space when that space lies in the final
/// fifth of the preview. Truncated previews end with `...`.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return "No text content".to_string();
    }
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let mut preview: String = cleaned.chars().take(max_chars).collect();
    if let Some(space) = preview.rfind(' ') {
        if preview[..space].chars().count() * 5 > max_chars * 4 {
            preview.truncate(space);
        }
    }
    preview.push_str("...");
    preview
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Aggregate numbers about a document's image slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub total_count: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub total_size_bytes: u64,
    /// Lowercased format tag -> count.
    pub formats: BTreeMap<String, usize>,
    pub avg_width: f64,
    pub avg_height: f64,
}

impl ImageStats {
    pub fn from_images(images: &[ImageRecord]) -> Self {
        let successful: Vec<&ImageRecord> = images.iter().filter(|i| i.is_extracted()).collect();
        let mut formats = BTreeMap::new();
        for img in &successful {
            *formats.entry(img.format.to_lowercase()).or_insert(0) += 1;
        }
        let n = successful.len();
        let avg = |total: u64| {
            if n == 0 {
                0.0
            } else {
                (total as f64 / n as f64 * 10.0).round() / 10.0
            }
        };
        Self {
            total_count: images.len(),
            successful_count: n,
            failed_count: images.len() - n,
            total_size_bytes: successful.iter().map(|i| i.size_bytes).sum(),
            formats,
            avg_width: avg(successful.iter().map(|i| u64::from(i.width)).sum()),
            avg_height: avg(successful.iter().map(|i| u64::from(i.height)).sum()),
        }
    }

    pub fn total_size_formatted(&self) -> String {
        format_bytes(self.total_size_bytes)
    }
}
