//! Upload type classification
//!
//! Content is sniffed first; the declared filename is only a fallback.
//! Nothing here confirms that a non-PDF really is an image; the converter
//! does that by decoding it.

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8; 4] = b"%PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifiedKind {
    Pdf,
    Image,
}

/// Decide whether an upload is a PDF or an image.
///
/// 1. Content starting with `%PDF` is a PDF, whatever it is called.
/// 2. Otherwise a name ending in `.pdf` (any case) is taken as a PDF.
/// 3. Everything else is presumed to be an image.
pub fn classify(data: &[u8], filename: Option<&str>) -> ClassifiedKind {
    if data.starts_with(PDF_SIGNATURE) {
        return ClassifiedKind::Pdf;
    }

    match filename {
        Some(name) if has_pdf_extension(name) => ClassifiedKind::Pdf,
        _ => ClassifiedKind::Image,
    }
}

fn has_pdf_extension(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}
