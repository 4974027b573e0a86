//! Page-level PDF types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::confidence::mean_confidence;
use crate::instrument::Measurement;

/// Rows of one detected table, each row a list of cell strings.
pub type TableRows = Vec<Vec<String>>;

/// How a page's final text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Layout-aware text and tables from the content stream
    Structured,
    /// Plain per-page text
    Text,
    /// Rasterized page run through OCR
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Structured => "structured",
            ExtractionMethod::Text => "text",
            ExtractionMethod::Ocr => "ocr",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text plus the tables found on the same page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    pub text: String,
    pub tables: Vec<TableRows>,
}

/// Page payload: plain text, or text with tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageContent {
    Plain(String),
    Structured(StructuredContent),
}

impl PageContent {
    /// The page text regardless of payload shape.
    pub fn text(&self) -> &str {
        match self {
            PageContent::Plain(text) => text,
            PageContent::Structured(content) => &content.text,
        }
    }

    /// Tables carried by the payload (empty for plain text).
    pub fn tables(&self) -> &[TableRows] {
        match self {
            PageContent::Plain(_) => &[],
            PageContent::Structured(content) => &content.tables,
        }
    }

    /// Whether the page has usable text.
    pub fn has_text(&self) -> bool {
        !self.text().trim().is_empty()
    }
}

/// The final result for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageExtraction {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Extracted payload
    pub content: PageContent,
    /// Method that produced the payload
    pub method: ExtractionMethod,
    /// Heuristic confidence in [0, 1]
    pub confidence: f64,
}

impl PageExtraction {
    /// Create a structured page.
    pub fn structured(page_number: u32, content: StructuredContent, confidence: f64) -> Self {
        Self {
            page_number,
            content: PageContent::Structured(content),
            method: ExtractionMethod::Structured,
            confidence,
        }
    }

    /// Create a plain-text page.
    pub fn text(page_number: u32, text: String, confidence: f64) -> Self {
        Self {
            page_number,
            content: PageContent::Plain(text),
            method: ExtractionMethod::Text,
            confidence,
        }
    }

    /// Create an OCR page.
    pub fn ocr(page_number: u32, text: String, confidence: f64) -> Self {
        Self {
            page_number,
            content: PageContent::Plain(text),
            method: ExtractionMethod::Ocr,
            confidence,
        }
    }

    /// Page text regardless of payload shape.
    pub fn plain_text(&self) -> &str {
        self.content.text()
    }
}

/// Document-level result for one PDF input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfExtractionResult {
    /// Page texts joined with a blank line
    pub text: String,
    /// One entry per source page, in page order
    pub pages: Vec<PageExtraction>,
    /// Mean page confidence (0.0 when there are no pages)
    pub confidence: f64,
    /// Wall-clock seconds
    pub time_taken: f64,
    /// Peak additional memory in MB
    pub memory_mb: f64,
    /// Set when the document failed
    pub error: Option<ExtractionError>,
}

impl PdfExtractionResult {
    /// Build a successful result from the final pages.
    pub fn from_pages(pages: Vec<PageExtraction>, measurement: Measurement) -> Self {
        let text = pages
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n");
        let confidence = mean_confidence(pages.iter().map(|p| p.confidence));

        Self {
            text,
            pages,
            confidence,
            time_taken: measurement.time_taken,
            memory_mb: measurement.memory_mb,
            error: None,
        }
    }

    /// Build a fail-closed result: no pages, no text, zero confidence.
    pub fn failed(error: ExtractionError, measurement: Measurement) -> Self {
        Self {
            text: String::new(),
            pages: Vec::new(),
            confidence: 0.0,
            time_taken: measurement.time_taken,
            memory_mb: measurement.memory_mb,
            error: Some(error),
        }
    }

    /// Whether the document was extracted without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Number of final pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Count pages produced by the given method.
    pub fn pages_by_method(&self, method: ExtractionMethod) -> usize {
        self.pages.iter().filter(|p| p.method == method).count()
    }
}
