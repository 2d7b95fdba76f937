//! pdfium library binding and document loading.
//!
//! The library is bound once per process and shared. `pdfium-render` is
//! built with `thread_safe` (calls are serialised) and `sync` (the handle is
//! `Send + Sync`), so it can live in a static and be used from any blocking
//! worker thread.

use crate::error::DissectError;
use crate::output::DocumentMetadata;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Return the process-wide pdfium handle, binding it on first use.
///
/// Search order: `$PDFIUM_LIB_PATH`, the current directory, then the
/// system library path.
pub fn pdfium() -> Result<&'static Pdfium, DissectError> {
    PDFIUM.get_or_try_init(|| {
        let from_env = std::env::var("PDFIUM_LIB_PATH")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(|dir| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)));

        let bindings = match from_env {
            Some(Ok(bindings)) => Ok(bindings),
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| DissectError::PdfiumBindingFailed(format!("{:?}", e)))?;

        debug!("pdfium library bound");
        Ok(Pdfium::new(bindings))
    })
}

/// Open a PDF, mapping pdfium's load error onto the fatal error kinds.
pub fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, DissectError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password.is_some(), format!("{:?}", e)))
}

fn classify_load_error(pdf_path: &Path, had_password: bool, detail: String) -> DissectError {
    let path = pdf_path.to_path_buf();
    if detail.to_lowercase().contains("password") {
        if had_password {
            DissectError::WrongPassword { path }
        } else {
            DissectError::PasswordRequired { path }
        }
    } else {
        DissectError::CorruptPdf { path, detail }
    }
}

/// Read the info dictionary of an open document.
pub fn read_metadata(document: &PdfDocument<'_>, opened_with_password: bool) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
        // pdfium does not expose the security handler once a document is open
        is_encrypted: opened_with_password,
    }
}

/// Extract document metadata without touching page content.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, DissectError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = pdfium()?;
        let document = load_document(pdfium, &path, pwd.as_deref())?;
        Ok(read_metadata(&document, pwd.is_some()))
    })
    .await
    .map_err(|e| DissectError::Internal(format!("Metadata task panicked: {}", e)))?
}
