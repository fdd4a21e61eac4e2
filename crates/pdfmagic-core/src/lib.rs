//! Upload classification and page assembly for PdfMagic
//!
//! Turns a batch of uploaded files into one PDF. Each upload is read,
//! classified by content (filename only as a fallback), converted to a
//! one-page PDF if it is an image, and its pages appended in upload order.
//!
//! Three modes share the pipeline and differ only in what they admit:
//! - [`merge_pdfs`]: PDFs only
//! - [`images_to_pdf`]: images only
//! - [`merge_files`]: any mix

pub mod classify;
pub mod convert;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod upload;

#[cfg(test)]
mod fixtures;

pub use classify::{classify, ClassifiedKind, PDF_SIGNATURE};
pub use convert::{image_to_pdf, normalize_color, NormalizedImage, PdfColorSpace};
pub use error::PdfMagicError;
pub use merge::PageSet;
pub use metrics::ProcessMetrics;
pub use pipeline::{images_to_pdf, merge_files, merge_pdfs, run, AssembledDocument, Mode, Route};
pub use upload::{display_name, read_upload, LoadedUpload, UploadItem};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfMagicError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| PdfMagicError::CorruptPdf {
        filename: upload::UNNAMED.to_string(),
        reason: e.to_string(),
    })?;
    Ok(doc.get_pages().len() as u32)
}
