//! Page extraction: text, embedded images and screenshots via pdfium.
//!
//! Everything here runs inside `spawn_blocking`; pdfium is a synchronous C
//! library and a page with hundreds of image objects can keep a thread busy
//! for seconds. Per-page failures are recorded and the loop moves on, only
//! document-level failures abort the run.

use crate::config::DissectConfig;
use crate::error::{DissectError, PageError};
use crate::output::{ExtractedDocument, ImageRecord, PageDimensions, PageRecord, TextBlock};
use crate::pipeline::{encode, pdfium};
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `page_003_img_001.png`
pub fn image_filename(page: usize, index: usize) -> String {
    format!("page_{page:03}_img_{index:03}.png")
}

/// `page_3_screenshot.png`
pub fn screenshot_filename(page: usize) -> String {
    format!("page_{page}_screenshot.png")
}

/// Settings the blocking extraction loop needs, detached from the config so
/// they can move into the worker thread.
#[derive(Clone)]
struct ExtractOptions {
    password: Option<String>,
    min_image_dimension: u32,
    screenshots: bool,
    screenshot_max_pixels: u32,
    progress: Option<ProgressCallback>,
}

/// Extract every selected page of `pdf_path`, writing images to `images_dir`.
///
/// `images_dir` must exist.
pub async fn extract_document(
    pdf_path: &Path,
    file_name: &str,
    images_dir: &Path,
    config: &DissectConfig,
) -> Result<ExtractedDocument, DissectError> {
    let path = pdf_path.to_path_buf();
    let images_dir = images_dir.to_path_buf();
    let file_name = file_name.to_string();
    let selection = config.pages.clone();
    let opts = ExtractOptions {
        password: config.password.clone(),
        min_image_dimension: config.min_image_dimension,
        screenshots: config.screenshots,
        screenshot_max_pixels: config.screenshot_max_pixels,
        progress: config.progress_callback.clone(),
    };

    tokio::task::spawn_blocking(move || {
        let pdfium = pdfium::pdfium()?;
        let document = pdfium::load_document(pdfium, &path, opts.password.as_deref())?;
        let metadata = pdfium::read_metadata(&document, opts.password.is_some());
        let total_pages = metadata.page_count;
        info!("PDF loaded: {} pages", total_pages);

        let indices = selection.to_indices(total_pages);
        if indices.is_empty() {
            return Err(DissectError::PageOutOfRange {
                page: 0,
                total: total_pages,
            });
        }

        let mut doc = ExtractedDocument {
            filename: file_name,
            page_count: total_pages,
            metadata,
            extracted_at: chrono::Utc::now().to_rfc3339(),
            ..Default::default()
        };
        extract_pages(&document, &indices, &images_dir, &opts, &mut doc);
        Ok(doc)
    })
    .await
    .map_err(|e| DissectError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_pages(
    document: &PdfDocument<'_>,
    indices: &[usize],
    images_dir: &Path,
    opts: &ExtractOptions,
    doc: &mut ExtractedDocument,
) {
    let selected = indices.len();
    if let Some(ref cb) = opts.progress {
        cb.on_extraction_start(selected);
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(opts.screenshot_max_pixels as i32)
        .set_maximum_height(opts.screenshot_max_pixels as i32);

    let pages = document.pages();
    for &idx in indices {
        let page_num = idx + 1;
        let errors_before = doc.errors.len();

        let page = match pages.get(idx as u16) {
            Ok(page) => page,
            Err(e) => {
                let err = PageError::PageFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                };
                warn!("{}", err);
                if let Some(ref cb) = opts.progress {
                    cb.on_page_error(page_num, selected, &err.to_string());
                }
                doc.errors.push(err);
                continue;
            }
        };

        let (text, text_blocks) = match page.text() {
            Ok(t) => (t.all(), text_blocks(&t)),
            Err(e) => {
                doc.errors.push(PageError::TextFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                });
                (String::new(), Vec::new())
            }
        };

        let mut images = Vec::new();
        let image_objects = page
            .objects()
            .iter()
            .filter(|obj| obj.as_image_object().is_some())
            .enumerate();
        for (index, object) in image_objects {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            let stored = image_object
                .get_raw_image()
                .map_err(|e| format!("{:?}", e))
                .and_then(|raw| {
                    store_image(images_dir, page_num, index, &raw, opts.min_image_dimension)
                });
            match stored {
                Ok(Some(record)) => images.push(record),
                Ok(None) => debug!("Page {}: skipped tiny image {}", page_num, index),
                Err(detail) => {
                    images.push(ImageRecord::failed(page_num, index, detail.clone()));
                    doc.errors.push(PageError::ImageFailed {
                        page: page_num,
                        index,
                        detail,
                    });
                }
            }
        }

        let screenshot = if opts.screenshots {
            let rendered = page
                .render_with_config(&render_config)
                .map_err(|e| format!("{:?}", e))
                .and_then(|bitmap| {
                    let name = screenshot_filename(page_num);
                    let bytes = encode::png_bytes(&bitmap.as_image()).map_err(|e| e.to_string())?;
                    write_image(images_dir, &name, &bytes).map_err(|e| e.to_string())?;
                    Ok(name)
                });
            match rendered {
                Ok(name) => Some(name),
                Err(detail) => {
                    doc.errors.push(PageError::ScreenshotFailed {
                        page: page_num,
                        detail,
                    });
                    None
                }
            }
        } else {
            None
        };

        if let Some(ref cb) = opts.progress {
            for err in &doc.errors[errors_before..] {
                cb.on_page_error(page_num, selected, &err.to_string());
            }
            cb.on_page_extracted(page_num, selected, images.len());
        }
        debug!(
            "Page {}: {} chars, {} images, screenshot={}",
            page_num,
            text.len(),
            images.len(),
            screenshot.is_some()
        );

        doc.pages.push(PageRecord {
            page_number: page_num,
            text,
            image_count: images.len(),
            screenshot,
            dimensions: Some(PageDimensions {
                width: page.width().value,
                height: page.height().value,
            }),
            text_blocks,
        });
        doc.images.extend(images);
    }
}

/// Positioned text runs of a page, blank segments dropped.
///
/// Font name and size come from the first visible character; pdfium breaks
/// segments on style changes, so that character speaks for the run.
fn text_blocks(text: &PdfPageText<'_>) -> Vec<TextBlock> {
    text.segments()
        .iter()
        .filter_map(|segment| {
            let content = segment.text();
            if content.trim().is_empty() {
                return None;
            }
            let bounds = segment.bounds();
            let style = segment.chars().ok().and_then(|chars| {
                chars
                    .iter()
                    .find(|c| c.unicode_char().is_some_and(|ch| !ch.is_whitespace()))
                    .map(|c| (c.font_name(), c.scaled_font_size().value))
            });
            let (font, size) = match style {
                Some((font, size)) => (Some(font).filter(|f| !f.is_empty()), Some(size)),
                None => (None, None),
            };
            Some(TextBlock {
                text: content,
                bbox: [
                    bounds.left().value,
                    bounds.bottom().value,
                    bounds.right().value,
                    bounds.top().value,
                ],
                font,
                size,
            })
        })
        .collect()
}

/// PNG-encode one decoded image and write it under `images_dir`.
///
/// Returns `Ok(None)` for images below `min_dimension` on either side.
pub fn store_image(
    images_dir: &Path,
    page: usize,
    index: usize,
    image: &DynamicImage,
    min_dimension: u32,
) -> Result<Option<ImageRecord>, String> {
    let (width, height) = (image.width(), image.height());
    if width < min_dimension || height < min_dimension {
        return Ok(None);
    }

    let bytes = encode::png_bytes(image).map_err(|e| format!("PNG encoding failed: {e}"))?;
    let filename = image_filename(page, index);
    write_image(images_dir, &filename, &bytes).map_err(|e| format!("write failed: {e}"))?;

    Ok(Some(
        ImageRecord::new(filename, page, index, width, height, bytes.len() as u64, "png")
            .with_content_hash(encode::content_hash(&bytes)),
    ))
}

fn write_image(images_dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = images_dir.join(filename);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([shade, shade, shade])))
    }

    #[test]
    fn file_names() {
        assert_eq!(image_filename(3, 1), "page_003_img_001.png");
        assert_eq!(image_filename(120, 15), "page_120_img_015.png");
        assert_eq!(screenshot_filename(7), "page_7_screenshot.png");
    }

    #[test]
    fn stores_png_with_hash() {
        let dir = tempfile::tempdir().unwrap();
        let record = store_image(dir.path(), 2, 0, &solid(40, 30, 200), 10)
            .expect("stored")
            .expect("not skipped");

        assert_eq!(record.filename.as_deref(), Some("page_002_img_000.png"));
        assert_eq!((record.width, record.height), (40, 30));
        assert_eq!(record.format, "png");
        let on_disk = std::fs::read(dir.path().join("page_002_img_000.png")).unwrap();
        assert_eq!(record.size_bytes, on_disk.len() as u64);
        assert_eq!(record.content_hash, Some(encode::content_hash(&on_disk)));
    }

    #[test]
    fn tiny_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_image(dir.path(), 1, 0, &solid(9, 300, 0), 10).unwrap().is_none());
        assert!(store_image(dir.path(), 1, 1, &solid(300, 9, 0), 10).unwrap().is_none());
        assert!(store_image(dir.path(), 1, 2, &solid(10, 10, 0), 10).unwrap().is_some());
    }

    #[test]
    fn same_pixels_on_two_pages_share_a_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = store_image(dir.path(), 1, 0, &solid(64, 64, 9), 10).unwrap().unwrap();
        let b = store_image(dir.path(), 5, 3, &solid(64, 64, 9), 10).unwrap().unwrap();
        assert_ne!(a.filename, b.filename);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn unwritable_dir_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = store_image(&missing, 1, 0, &solid(20, 20, 0), 10).unwrap_err();
        assert!(err.starts_with("write failed"));
    }
}
