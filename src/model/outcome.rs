//! A result record of either document kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DocxExtractionResult, ExtractionError, PdfExtractionResult};
use crate::detect::DocumentKind;
use crate::instrument::Measurement;

/// The record produced for one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Pdf(PdfExtractionResult),
    Docx(DocxExtractionResult),
}

impl ExtractionOutcome {
    /// A fail-closed record shaped for `kind`.
    pub fn failed(kind: DocumentKind, error: ExtractionError, measurement: Measurement) -> Self {
        match kind {
            DocumentKind::Pdf => Self::Pdf(PdfExtractionResult::failed(error, measurement)),
            DocumentKind::Docx => Self::Docx(DocxExtractionResult::failed(error, measurement)),
        }
    }

    /// The record the batch collector writes when a deadline passes.
    pub fn timed_out(kind: DocumentKind, timeout: Duration) -> Self {
        Self::failed(
            kind,
            ExtractionError::timeout(),
            Measurement::elapsed_only(timeout),
        )
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Pdf(_) => DocumentKind::Pdf,
            Self::Docx(_) => DocumentKind::Docx,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Pdf(r) => &r.text,
            Self::Docx(r) => &r.text,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Pdf(r) => r.confidence,
            Self::Docx(r) => r.confidence,
        }
    }

    pub fn time_taken(&self) -> f64 {
        match self {
            Self::Pdf(r) => r.time_taken,
            Self::Docx(r) => r.time_taken,
        }
    }

    pub fn memory_mb(&self) -> f64 {
        match self {
            Self::Pdf(r) => r.memory_mb,
            Self::Docx(r) => r.memory_mb,
        }
    }

    pub fn error(&self) -> Option<&ExtractionError> {
        match self {
            Self::Pdf(r) => r.error.as_ref(),
            Self::Docx(r) => r.error.as_ref(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error().is_none()
    }

    /// Pages for a PDF, blocks for a DOCX.
    pub fn unit_count(&self) -> usize {
        match self {
            Self::Pdf(r) => r.pages.len(),
            Self::Docx(r) => r.blocks.len(),
        }
    }
}

impl From<PdfExtractionResult> for ExtractionOutcome {
    fn from(result: PdfExtractionResult) -> Self {
        Self::Pdf(result)
    }
}

impl From<DocxExtractionResult> for ExtractionOutcome {
    fn from(result: DocxExtractionResult) -> Self {
        Self::Docx(result)
    }
}
