//! Top-level entry points: extract, classify, describe, report.

use crate::classify::classify;
use crate::config::DissectConfig;
use crate::error::{DissectError, PageError};
use crate::output::{DissectOutput, DissectStats, DocumentMetadata, ImageDescription};
use crate::pipeline::{describe, extract, input, pdfium};
use crate::report::{self, ReportContext};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Dissect a PDF file or URL into an HTML report under `out_dir`.
///
/// # Arguments
/// * `input_str`: Local file path or HTTP/HTTPS URL to a PDF
/// * `out_dir`: Directory receiving the report, sidecars and `images/`
/// * `config`: Run configuration
///
/// # Returns
/// `Ok(DissectOutput)` even when some pages, images or descriptions failed;
/// those are listed in `output.document.errors`.
///
/// # Errors
/// Returns `Err(DissectError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Corrupt or locked PDF
/// - No page matched the selection
/// - The output directory or a report file could not be written
/// - Descriptions were requested but no provider is configured
pub async fn dissect(
    input_str: impl AsRef<str>,
    out_dir: impl AsRef<Path>,
    config: &DissectConfig,
) -> Result<DissectOutput, DissectError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let out_dir = out_dir.as_ref();
    info!("Starting dissect: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let files = report::report_paths(out_dir, &resolved.stem());

    tokio::fs::create_dir_all(&files.images_dir)
        .await
        .map_err(|source| DissectError::OutputWriteFailed {
            path: files.images_dir.clone(),
            source,
        })?;

    // ── Step 2: Provider, before any slow work ───────────────────────────
    let provider = if config.describe_images {
        Some(describe::resolve_provider(config)?)
    } else {
        None
    };

    // ── Step 3: Extract pages ────────────────────────────────────────────
    let extract_start = Instant::now();
    let mut document =
        extract::extract_document(resolved.path(), &resolved.file_name(), &files.images_dir, config)
            .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} pages, {} images in {}ms",
        document.pages.len(),
        document.images.len(),
        extract_duration_ms
    );

    // ── Step 4: Classify ─────────────────────────────────────────────────
    let classification = classify(document.images.clone(), config.min_image_size);
    debug!(
        "Classified: {} unique, {} groups, {} small, {} regular",
        classification.duplicates.unique.len(),
        classification.duplicates.groups.len(),
        classification.sizes.small.len(),
        classification.sizes.regular.len()
    );

    // ── Step 5: Describe unique regular images ───────────────────────────
    let describe_start = Instant::now();
    let descriptions: Vec<ImageDescription> = match provider {
        Some(ref provider) => {
            let targets = describe::description_targets(&classification);
            let (descriptions, errors) =
                describe::describe_images(provider, &targets, &files.images_dir, config).await;
            document.errors.extend(errors);
            descriptions
        }
        None => Vec::new(),
    };
    let describe_duration_ms = describe_start.elapsed().as_millis() as u64;

    // ── Step 6: Write report ─────────────────────────────────────────────
    let pages_json_name = files
        .pages_json
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ctx = ReportContext::new(
        &document,
        &classification,
        &descriptions,
        config.pages_per_chunk,
        config.text_preview_chars,
        pages_json_name,
    );
    report::write_report(&ctx, &files).await?;

    // ── Step 7: Stats ────────────────────────────────────────────────────
    let failed_pages = document
        .errors
        .iter()
        .filter(|e| matches!(e, PageError::PageFailed { .. }))
        .count();
    let failed_images = document.images.iter().filter(|i| !i.is_extracted()).count();
    let unique_images = classification.duplicates.unique.len();
    let stats = DissectStats {
        total_pages: document.page_count,
        extracted_pages: document.pages.len(),
        failed_pages,
        total_images: document.images.len(),
        failed_images,
        unique_images,
        duplicate_images: document.images.len() - failed_images - unique_images,
        small_images: classification.sizes.small.len(),
        regular_images: classification.sizes.regular.len(),
        described_images: descriptions.len(),
        extract_duration_ms,
        describe_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Dissect complete: {}/{} pages, {} images ({} unique), {}ms total",
        stats.extracted_pages,
        stats.total_pages,
        stats.total_images,
        stats.unique_images,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(stats.extracted_pages + failed_pages, stats.extracted_pages);
    }

    Ok(DissectOutput {
        document,
        classification,
        descriptions,
        report: files,
        stats,
    })
}

/// Synchronous wrapper around [`dissect`].
///
/// Creates a temporary tokio runtime internally.
pub fn dissect_sync(
    input_str: impl AsRef<str>,
    out_dir: impl AsRef<Path>,
    config: &DissectConfig,
) -> Result<DissectOutput, DissectError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DissectError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(dissect(input_str, out_dir, config))
}

/// Read PDF metadata without extracting anything.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, DissectError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    pdfium::extract_metadata(resolved.path(), None).await
}
