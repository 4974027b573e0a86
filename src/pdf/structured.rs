//! Layout-aware text and table extraction for born-digital pages.

use std::path::Path;

use super::PageSource;
use crate::confidence::alpha_ratio;
use crate::error::{Error, Result};
use crate::model::{PageExtraction, StructuredContent};
use crate::parser::{render_lines, LayoutAnalyzer, PdfDocument, TableDetector};

/// Primary extractor: positioned spans grouped into lines, plus stream-mode
/// tables from the same spans.
///
/// When the span pass yields nothing for a page, the PDF library's own text
/// extractor is tried before giving up on the page. A failure on any page
/// aborts the document.
#[derive(Debug, Clone, Default)]
pub struct StructuredExtractor {
    detector: TableDetector,
}

impl StructuredExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_detector(detector: TableDetector) -> Self {
        Self { detector }
    }

    /// Extract every page of an opened document.
    pub fn extract_document(&self, doc: &PdfDocument) -> Result<Vec<PageExtraction>> {
        let analyzer = LayoutAnalyzer::new(doc);
        doc.pages()
            .keys()
            .map(|&n| {
                self.extract_page(doc, &analyzer, n)
                    .map_err(|e| Error::PageExtraction {
                        page: n,
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    fn extract_page(
        &self,
        doc: &PdfDocument,
        analyzer: &LayoutAnalyzer<'_>,
        page_number: u32,
    ) -> Result<PageExtraction> {
        let spans = analyzer.page_spans(page_number)?;
        let tables = self.detector.extract_rows(&spans);
        if !tables.is_empty() {
            log::debug!("page {}: {} tables", page_number, tables.len());
        }

        let mut text = render_lines(&analyzer.lines(spans));
        if text.trim().is_empty() {
            text = doc.plain_text(page_number)?.trim_end().to_string();
        }

        let confidence = alpha_ratio(&text);
        Ok(PageExtraction::structured(
            page_number,
            StructuredContent { text, tables },
            confidence,
        ))
    }
}

impl PageSource for StructuredExtractor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, path: &Path) -> Result<Vec<PageExtraction>> {
        let doc = PdfDocument::open(path)?;
        self.extract_document(&doc)
    }
}
