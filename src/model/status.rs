//! Error records and the stage vocabulary.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifies which sub-step of a pipeline failed.
///
/// The vocabulary is open: the associated constants cover the stages docex
/// itself reports, and callers may mint their own with [`Stage::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(Cow<'static, str>);

impl Stage {
    pub const DOCUMENT_OPEN: Stage = Stage(Cow::Borrowed("document_open"));
    pub const UNSUPPORTED_FORMAT: Stage = Stage(Cow::Borrowed("unsupported_format"));
    pub const OCR_RASTERIZE_EXHAUSTED: Stage = Stage(Cow::Borrowed("ocr_rasterize_exhausted"));
    pub const OCR_ENGINE: Stage = Stage(Cow::Borrowed("ocr_engine"));
    pub const PDF_PIPELINE: Stage = Stage(Cow::Borrowed("pdf_extraction_pipeline"));
    pub const DOCX_PIPELINE: Stage = Stage(Cow::Borrowed("docx_extraction_pipeline"));
    pub const BATCH_TIMEOUT: Stage = Stage(Cow::Borrowed("batch_timeout"));
    pub const BATCH_WORKER_EXCEPTION: Stage = Stage(Cow::Borrowed("batch_worker_exception"));

    /// Create a custom stage.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Stage name as written into result records.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured failure attached to a result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionError {
    /// Human-readable description
    pub message: String,
    /// Sub-step that failed
    pub stage: Stage,
}

impl ExtractionError {
    /// Create a new error record.
    pub fn new(message: impl Into<String>, stage: Stage) -> Self {
        Self {
            message: message.into(),
            stage,
        }
    }

    /// Convert an internal error, using `fallback` when the error does not
    /// carry a stage of its own.
    pub fn from_error(err: &Error, fallback: Stage) -> Self {
        Self::new(err.to_string(), err.stage().unwrap_or(fallback))
    }

    /// Record synthesized by the batch collector when a deadline passes.
    pub fn timeout() -> Self {
        Self::new("Timeout exceeded", Stage::BATCH_TIMEOUT)
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}
