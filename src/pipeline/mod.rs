//! Pipeline stages for dissecting a PDF.
//!
//! Each submodule implements one step so it can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (classify) ──▶ describe ──▶ (report)
//! (URL/path) (pdfium)                   (VLM)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`pdfium`]: bind the pdfium library once and open documents
//! 3. [`extract`]: pull text, images and screenshots; runs in
//!    `spawn_blocking` because pdfium is synchronous
//! 4. [`encode`]: PNG bytes, blake3 content hashes and base64 `ImageData`
//! 5. [`describe`]: VLM calls with retry/backoff; the only network stage
//!    besides URL download
//! 6. [`postprocess`]: cleanup rules for VLM output

pub mod describe;
pub mod encode;
pub mod extract;
pub mod input;
pub mod pdfium;
pub mod postprocess;
