//! Upload reader
//!
//! An [`UploadItem`] owns its content source. Reading consumes the item, so
//! the source is dropped (and any handle released) whether or not the read
//! succeeds.

use std::fmt;
use std::io::{Cursor, Read};

use crate::error::PdfMagicError;

/// Name reported for uploads that arrived without a filename.
pub const UNNAMED: &str = "unnamed";

/// One file submitted in a request batch.
pub struct UploadItem {
    filename: Option<String>,
    source: Box<dyn Read + Send>,
}

impl UploadItem {
    pub fn new(filename: Option<String>, source: impl Read + Send + 'static) -> Self {
        Self {
            filename,
            source: Box::new(source),
        }
    }

    /// Build an item from content already held in memory.
    pub fn from_bytes(filename: Option<&str>, data: Vec<u8>) -> Self {
        Self::new(filename.map(str::to_string), Cursor::new(data))
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

impl fmt::Debug for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadItem")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// The full content of an upload after it has been read.
#[derive(Debug, Clone)]
pub struct LoadedUpload {
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl LoadedUpload {
    pub fn display_name(&self) -> &str {
        display_name(self.filename.as_deref())
    }
}

/// Name used in logs and error messages for an optional filename.
pub fn display_name(filename: Option<&str>) -> &str {
    filename.filter(|name| !name.is_empty()).unwrap_or(UNNAMED)
}

/// Read an upload to the end, rejecting zero-length content.
pub fn read_upload(item: UploadItem) -> Result<LoadedUpload, PdfMagicError> {
    let UploadItem {
        filename,
        mut source,
    } = item;

    let mut data = Vec::new();
    let read = source.read_to_end(&mut data);
    drop(source);

    if let Err(source) = read {
        return Err(PdfMagicError::Io {
            filename: display_name(filename.as_deref()).to_string(),
            source,
        });
    }

    if data.is_empty() {
        return Err(PdfMagicError::EmptyInput {
            filename: display_name(filename.as_deref()).to_string(),
        });
    }

    Ok(LoadedUpload { filename, data })
}
