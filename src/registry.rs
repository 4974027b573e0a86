//! Extension-based dispatch to document extractors.
//!
//! # Example
//!
//! ```no_run
//! use docex::registry::ExtractorRegistry;
//! use std::path::Path;
//!
//! fn main() -> docex::Result<()> {
//!     let registry = ExtractorRegistry::with_defaults();
//!     let outcome = registry.extract(Path::new("resume.docx"))?;
//!     println!("{}", outcome.text());
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detect::DocumentKind;
use crate::docx::{DocxExtractor, DocxOptions};
use crate::error::{Error, Result};
use crate::model::ExtractionOutcome;
use crate::pdf::{OcrOptions, PdfExtractor, PdfOptions};

/// An extractor for one document kind.
///
/// `extract` never fails; failures are reported inside the outcome.
pub trait DocumentExtractor: Send + Sync {
    fn kind(&self) -> DocumentKind;

    fn name(&self) -> &str;

    fn extract(&self, path: &Path) -> ExtractionOutcome;
}

impl DocumentExtractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> ExtractionOutcome {
        PdfExtractor::extract(self, path).into()
    }
}

impl DocumentExtractor for DocxExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Docx
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn extract(&self, path: &Path) -> ExtractionOutcome {
        DocxExtractor::extract(self, path).into()
    }
}

/// Settings shared by the default extractors.
#[derive(Debug, Clone, Default)]
pub struct ExtractorOptions {
    pub base_dir: Option<PathBuf>,
    pub ocr: OcrOptions,
}

impl ExtractorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_ocr(mut self, ocr: OcrOptions) -> Self {
        self.ocr = ocr;
        self
    }
}

/// Maps document kinds to extractors.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentKind, Arc<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// PDF and DOCX extractors with default options.
    pub fn with_defaults() -> Self {
        Self::from_options(&ExtractorOptions::default())
    }

    /// PDF and DOCX extractors sharing a base directory and OCR settings.
    pub fn from_options(options: &ExtractorOptions) -> Self {
        let mut pdf = PdfOptions::new().with_ocr(options.ocr.clone());
        let mut docx = DocxOptions::new();
        if let Some(dir) = &options.base_dir {
            pdf = pdf.with_base_dir(dir);
            docx = docx.with_base_dir(dir);
        }

        let mut registry = Self::new();
        registry.register(Arc::new(PdfExtractor::with_options(pdf)));
        registry.register(Arc::new(DocxExtractor::with_options(docx)));
        registry
    }

    /// Register an extractor, replacing any previous one for its kind.
    pub fn register(&mut self, extractor: Arc<dyn DocumentExtractor>) {
        self.extractors.insert(extractor.kind(), extractor);
    }

    pub fn get(&self, kind: DocumentKind) -> Option<Arc<dyn DocumentExtractor>> {
        self.extractors.get(&kind).cloned()
    }

    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentExtractor>> {
        DocumentKind::from_extension(ext).and_then(|kind| self.get(kind))
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.get_by_extension(ext).is_some()
    }

    /// Extract a file with the extractor registered for its extension.
    ///
    /// Returns [`Error::UnsupportedFormat`] when no extractor handles the
    /// extension; everything else is reported inside the outcome.
    pub fn extract(&self, path: &Path) -> Result<ExtractionOutcome> {
        let extractor = DocumentKind::from_path(path)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        log::debug!("{}: using {} extractor", path.display(), extractor.name());
        Ok(extractor.extract(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_kinds() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.supports("pdf"));
        assert!(registry.supports("DOCX"));
        assert!(!registry.supports("doc"));
        assert_eq!(registry.get(DocumentKind::Docx).unwrap().name(), "docx");
    }

    #[test]
    fn test_unknown_extension_is_an_error() {
        let registry = ExtractorRegistry::with_defaults();
        let err = registry.extract(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_reported_in_outcome() {
        let registry = ExtractorRegistry::with_defaults();
        let outcome = registry.extract(Path::new("/nonexistent/file.pdf")).unwrap();
        assert_eq!(outcome.kind(), DocumentKind::Pdf);
        assert_eq!(
            outcome.error().map(|e| e.stage.clone()),
            Some(crate::model::Stage::DOCUMENT_OPEN)
        );
    }
}
