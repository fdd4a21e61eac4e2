use thiserror::Error;

/// Everything that can abort a pipeline run.
///
/// Variants that concern a single upload carry its display name so the
/// caller can tell the user which file to fix.
#[derive(Error, Debug)]
pub enum PdfMagicError {
    #[error("Empty file: {filename}")]
    EmptyInput { filename: String },

    #[error("Non-PDF file provided: {filename}")]
    NonPdfInput { filename: String },

    #[error("PDF not allowed in images-only flow: {filename}")]
    PdfNotAllowed { filename: String },

    #[error("Unsupported image file: {filename}")]
    UnsupportedImage { filename: String, reason: String },

    #[error("{0}")]
    NoPages(String),

    #[error("Failed to parse PDF {filename}: {reason}")]
    CorruptPdf { filename: String, reason: String },

    #[error("Failed to read {filename}: {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write PDF: {0}")]
    Serialization(String),
}

impl PdfMagicError {
    /// True for failures caused by the uploaded content itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Serialization(_))
    }

    /// The upload this error refers to, if any.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::EmptyInput { filename }
            | Self::NonPdfInput { filename }
            | Self::PdfNotAllowed { filename }
            | Self::UnsupportedImage { filename, .. }
            | Self::CorruptPdf { filename, .. }
            | Self::Io { filename, .. } => Some(filename),
            Self::NoPages(_) | Self::Serialization(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = PdfMagicError::NonPdfInput {
            filename: "photo.png".into(),
        };
        assert_eq!(err.to_string(), "Non-PDF file provided: photo.png");
        assert_eq!(err.filename(), Some("photo.png"));
    }

    #[test]
    fn test_unsupported_image_hides_decoder_detail() {
        let err = PdfMagicError::UnsupportedImage {
            filename: "corrupt.png".into(),
            reason: "invalid PNG signature".into(),
        };
        assert_eq!(err.to_string(), "Unsupported image file: corrupt.png");
    }

    #[test]
    fn test_server_side_failures_are_not_client_errors() {
        assert!(!PdfMagicError::Serialization("disk full".into()).is_client_error());
        assert!(PdfMagicError::NoPages("No pages to merge".into()).is_client_error());
        assert_eq!(PdfMagicError::NoPages("x".into()).filename(), None);
    }
}
