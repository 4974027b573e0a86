//! Error types for docex.

use std::io;
use thiserror::Error;

use crate::model::Stage;

/// Result type alias for docex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a document.
///
/// These never escape a public `extract` call: each document-level entry
/// point converts them into an [`ExtractionError`](crate::model::ExtractionError)
/// carried by the result record.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file extension or signature is not handled by this extractor.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// The container cannot be opened or parsed.
    #[error("Corrupted document: {0}")]
    CorruptedDocument(String),

    /// A single page failed inside a text-based extractor.
    ///
    /// Text extractors are not page-tolerant, so this aborts the document.
    #[error("Extraction failed on page {page}: {reason}")]
    PageExtraction { page: u32, reason: String },

    /// Rasterization kept failing until the retry budget ran out.
    #[error("Rasterization failed after {attempts} attempts: {last_error}")]
    OcrRasterizeExhausted { attempts: u32, last_error: String },

    /// The OCR engine failed or produced no usable output.
    #[error("OCR engine error: {0}")]
    OcrEngine(String),

    /// Error from the PDF object layer.
    #[error("PDF parsing error: {0}")]
    Pdf(String),

    /// Error parsing an OOXML part.
    #[error("XML error: {0}")]
    Xml(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The stage this failure reports, when the variant pins one down.
    ///
    /// Variants without a fixed stage return `None`; the caller supplies its
    /// own pipeline stage instead.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::UnsupportedFormat(_) => Some(Stage::UNSUPPORTED_FORMAT),
            Error::CorruptedDocument(_) => Some(Stage::DOCUMENT_OPEN),
            Error::OcrRasterizeExhausted { .. } => Some(Stage::OCR_RASTERIZE_EXHAUSTED),
            Error::OcrEngine(_) => Some(Stage::OCR_ENGINE),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::CorruptedDocument(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageExtraction {
            page: 3,
            reason: "bad stream".to_string(),
        };
        assert_eq!(err.to_string(), "Extraction failed on page 3: bad stream");

        let err = Error::OcrRasterizeExhausted {
            attempts: 2,
            last_error: "exit status 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Rasterization failed after 2 attempts: exit status 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            Error::UnsupportedFormat("x.txt".into()).stage(),
            Some(Stage::UNSUPPORTED_FORMAT)
        );
        assert_eq!(
            Error::CorruptedDocument("eof".into()).stage(),
            Some(Stage::DOCUMENT_OPEN)
        );
        assert_eq!(
            Error::OcrEngine("no text".into()).stage(),
            Some(Stage::OCR_ENGINE)
        );
        assert_eq!(Error::Other("boom".into()).stage(), None);
    }
}
