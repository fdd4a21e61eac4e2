//! Pipeline orchestration
//!
//! Every mode runs the same loop over the uploads, in arrival order:
//! read → classify → mode policy → (convert →) append. The first failing
//! item aborts the run and nothing is produced.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::classify::{classify, ClassifiedKind};
use crate::convert::image_to_pdf;
use crate::error::PdfMagicError;
use crate::merge::PageSet;
use crate::metrics::ProcessMetrics;
use crate::upload::{read_upload, UploadItem};

/// The three operations, each with its own admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// PDFs only
    MergePdfs,
    /// Images only
    ImagesToPdf,
    /// Any mix of PDFs and images
    MergeFiles,
}

/// What the pipeline does with an admitted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Append,
    ConvertThenAppend,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::MergePdfs, Mode::ImagesToPdf, Mode::MergeFiles];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::MergePdfs => "merge-pdfs",
            Mode::ImagesToPdf => "images-to-pdf",
            Mode::MergeFiles => "merge-files",
        }
    }

    /// Suggested download name for the assembled document.
    pub fn output_filename(self) -> &'static str {
        match self {
            Mode::MergePdfs => "merged.pdf",
            Mode::ImagesToPdf => "images.pdf",
            Mode::MergeFiles => "merged-files.pdf",
        }
    }

    /// Message reported when a batch yields no pages.
    pub fn empty_message(self) -> &'static str {
        match self {
            Mode::MergePdfs => "No PDF pages to merge",
            Mode::ImagesToPdf => "No images to convert",
            Mode::MergeFiles => "No pages to merge",
        }
    }

    /// Apply this mode's policy to a classified item.
    pub fn route(self, kind: ClassifiedKind, name: &str) -> Result<Route, PdfMagicError> {
        match (self, kind) {
            (Mode::MergePdfs, ClassifiedKind::Pdf) | (Mode::MergeFiles, ClassifiedKind::Pdf) => {
                Ok(Route::Append)
            }
            (Mode::ImagesToPdf, ClassifiedKind::Image)
            | (Mode::MergeFiles, ClassifiedKind::Image) => Ok(Route::ConvertThenAppend),
            (Mode::MergePdfs, ClassifiedKind::Image) => Err(PdfMagicError::NonPdfInput {
                filename: name.to_string(),
            }),
            (Mode::ImagesToPdf, ClassifiedKind::Pdf) => Err(PdfMagicError::PdfNotAllowed {
                filename: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized output of a successful run.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub filename: &'static str,
    pub metrics: ProcessMetrics,
}

/// Run `mode` over `items` and return the combined PDF.
pub fn run<I>(mode: Mode, items: I) -> Result<AssembledDocument, PdfMagicError>
where
    I: IntoIterator<Item = UploadItem>,
{
    let started = Instant::now();
    let mut pages = PageSet::new();
    let mut metrics = ProcessMetrics::default();

    for item in items {
        let upload = read_upload(item)?;
        let name = upload.display_name();
        let kind = classify(&upload.data, upload.filename.as_deref());

        let route = mode.route(kind, name).inspect_err(|e| {
            warn!("{} rejected {}: {}", mode, name, e);
        })?;

        let added = match route {
            Route::Append => pages.append_pdf(name, &upload.data)?,
            Route::ConvertThenAppend => {
                let converted = image_to_pdf(name, &upload.data)?;
                pages.append_pdf(name, &converted)?
            }
        };

        debug!(
            "{}: {} ({:?}, {} bytes) added {} page(s)",
            mode,
            name,
            kind,
            upload.data.len(),
            added
        );

        metrics.item_count += 1;
        metrics.input_size_bytes += upload.data.len();
    }

    if pages.is_empty() {
        return Err(PdfMagicError::NoPages(mode.empty_message().to_string()));
    }

    metrics.page_count = pages.len();
    let bytes = pages.finish()?;
    metrics.output_size_bytes = bytes.len();
    metrics.processing_time_ms = started.elapsed().as_millis() as u64;

    info!(
        "{}: {} item(s), {} page(s), {} -> {} bytes in {}ms",
        mode,
        metrics.item_count,
        metrics.page_count,
        metrics.input_size_bytes,
        metrics.output_size_bytes,
        metrics.processing_time_ms
    );

    Ok(AssembledDocument {
        bytes,
        filename: mode.output_filename(),
        metrics,
    })
}

/// Concatenate PDFs; any other upload is rejected.
pub fn merge_pdfs<I>(items: I) -> Result<AssembledDocument, PdfMagicError>
where
    I: IntoIterator<Item = UploadItem>,
{
    run(Mode::MergePdfs, items)
}

/// Convert images to one page each; PDFs are rejected.
pub fn images_to_pdf<I>(items: I) -> Result<AssembledDocument, PdfMagicError>
where
    I: IntoIterator<Item = UploadItem>,
{
    run(Mode::ImagesToPdf, items)
}

/// Concatenate any mix of PDFs and images in upload order.
pub fn merge_files<I>(items: I) -> Result<AssembledDocument, PdfMagicError>
where
    I: IntoIterator<Item = UploadItem>,
{
    run(Mode::MergeFiles, items)
}
