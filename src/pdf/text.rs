//! Plain per-page text, the fallback when the structured pass finds no pages.

use std::path::Path;

use super::PageSource;
use crate::confidence::word_count_confidence;
use crate::error::{Error, Result};
use crate::model::PageExtraction;
use crate::parser::PdfDocument;

/// Private-use glyph some fonts map their bullet to.
const PRIVATE_USE_BULLET: char = '\u{F0B7}';

/// Normalize extracted text before it is scored.
///
/// Non-breaking spaces become spaces, mis-decoded bullets (`U+F0B7`, `¢`)
/// become `•`, and the result is trimmed.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            PRIVATE_USE_BULLET | '¢' => '•',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text-only extraction through the PDF library, scored by word count.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTextExtractor;

impl FallbackTextExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_document(&self, doc: &PdfDocument) -> Result<Vec<PageExtraction>> {
        doc.pages()
            .keys()
            .map(|&n| {
                let raw = doc.plain_text(n).map_err(|e| {
                    Error::CorruptedDocument(format!("text extraction failed on page {}: {}", n, e))
                })?;
                let text = clean_text(&raw);
                let confidence = word_count_confidence(&text);
                Ok(PageExtraction::text(n, text, confidence))
            })
            .collect()
    }
}

impl PageSource for FallbackTextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, path: &Path) -> Result<Vec<PageExtraction>> {
        let doc = PdfDocument::open(path)?;
        self.extract_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\u{00A0}b \n"), "a b");
        assert_eq!(clean_text("\u{F0B7} item\n¢ other"), "• item\n• other");
        assert_eq!(clean_text(" \n\t "), "");
    }
}
