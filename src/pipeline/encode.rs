//! Image encoding: `DynamicImage` → PNG bytes, content hashes, and the
//! base64 `ImageData` payload sent to the VLM.
//!
//! Every extracted image is re-encoded as PNG so the files on disk, their
//! hashes and what the model sees all come from the same bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image losslessly as PNG.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// blake3 hex digest of encoded image bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Wrap PNG bytes for a multimodal chat message.
///
/// `detail: "high"` keeps small labels and chart text readable for
/// GPT-4-class models.
pub fn to_image_data(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/png").with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square(side: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn png_has_signature() {
        let bytes = png_bytes(&red_square(10)).expect("encode should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn identical_pixels_hash_identically() {
        let a = png_bytes(&red_square(12)).unwrap();
        let b = png_bytes(&red_square(12)).unwrap();
        let c = png_bytes(&red_square(13)).unwrap();
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_ne!(content_hash(&a), content_hash(&c));
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn image_data_is_base64_png() {
        let bytes = png_bytes(&red_square(10)).unwrap();
        let data = to_image_data(&bytes);
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, bytes);
    }
}
