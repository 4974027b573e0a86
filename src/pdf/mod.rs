//! PDF extraction pipeline.
//!
//! [`PdfExtractor`] runs the structured extractor first, falls back to plain
//! per-page text only when the structured pass yields no pages at all, and
//! escalates every page whose text is blank to OCR. Whatever goes wrong is
//! turned into an error record exactly once, at the top.

mod ocr;
mod structured;
mod text;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use ocr::{
    OcrEngine, OcrExtractor, OcrOptions, PageSpan, PdftoppmRasterizer, Rasterizer,
    TesseractEngine,
};
pub use structured::StructuredExtractor;
pub use text::{clean_text, FallbackTextExtractor};

use crate::detect::resolve_input;
use crate::error::Result;
use crate::instrument::Meter;
use crate::model::{ExtractionError, PageExtraction, PdfExtractionResult, Stage};

/// Produces one [`PageExtraction`] per page of a document, or fails the
/// whole document.
pub trait PageSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    fn extract(&self, path: &Path) -> Result<Vec<PageExtraction>>;
}

/// Produces the replacement for a single page that has no usable text.
pub trait PageRecognizer: Send + Sync {
    fn recognize_page(&self, path: &Path, page_number: u32) -> Result<PageExtraction>;
}

/// What happens to one page coming out of a text-based extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The page has text and is final.
    Keep(PageExtraction),
    /// The page is blank; OCR this page number instead.
    Escalate(u32),
}

impl PageOutcome {
    /// Keep a page whose text is non-empty after trimming, escalate the rest.
    pub fn triage(page: PageExtraction) -> Self {
        if page.content.has_text() {
            PageOutcome::Keep(page)
        } else {
            PageOutcome::Escalate(page.page_number)
        }
    }
}

/// Options for [`PdfExtractor`].
#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    /// Directory relative input paths are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Run the plain-text fallback when the structured pass fails, not only
    /// when it yields no pages.
    pub fallback_on_structured_error: bool,
    /// OCR settings for the default recognizer.
    pub ocr: OcrOptions,
}

impl PdfOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_fallback_on_structured_error(mut self, enabled: bool) -> Self {
        self.fallback_on_structured_error = enabled;
        self
    }

    pub fn with_ocr(mut self, ocr: OcrOptions) -> Self {
        self.ocr = ocr;
        self
    }
}

/// Extracts a PDF through the structured → text → OCR chain.
#[derive(Clone)]
pub struct PdfExtractor {
    options: PdfOptions,
    primary: Arc<dyn PageSource>,
    fallback: Arc<dyn PageSource>,
    recognizer: Arc<dyn PageRecognizer>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor {
    /// Extractor with default options and the `pdftoppm`/`tesseract` OCR backend.
    pub fn new() -> Self {
        Self::with_options(PdfOptions::default())
    }

    pub fn with_options(options: PdfOptions) -> Self {
        let recognizer = OcrExtractor::new(options.ocr.clone());
        Self {
            options,
            primary: Arc::new(StructuredExtractor::new()),
            fallback: Arc::new(FallbackTextExtractor::new()),
            recognizer: Arc::new(recognizer),
        }
    }

    /// Replace the structured extractor.
    pub fn with_primary(mut self, source: impl PageSource + 'static) -> Self {
        self.primary = Arc::new(source);
        self
    }

    /// Replace the plain-text fallback.
    pub fn with_fallback(mut self, source: impl PageSource + 'static) -> Self {
        self.fallback = Arc::new(source);
        self
    }

    /// Replace the per-page OCR step.
    pub fn with_recognizer(mut self, recognizer: impl PageRecognizer + 'static) -> Self {
        self.recognizer = Arc::new(recognizer);
        self
    }

    pub fn options(&self) -> &PdfOptions {
        &self.options
    }

    /// Extract a document. Never fails: errors come back inside the result.
    pub fn extract(&self, path: impl AsRef<Path>) -> PdfExtractionResult {
        let meter = Meter::start();
        let path = resolve_input(self.options.base_dir.as_deref(), path.as_ref());

        match self.run(&path) {
            Ok(pages) => {
                let result = PdfExtractionResult::from_pages(pages, meter.finish());
                log::info!(
                    "{}: {} pages, confidence {:.2}",
                    path.display(),
                    result.page_count(),
                    result.confidence
                );
                result
            }
            Err(e) => {
                log::warn!("{}: extraction failed: {}", path.display(), e);
                PdfExtractionResult::failed(
                    ExtractionError::from_error(&e, Stage::PDF_PIPELINE),
                    meter.finish(),
                )
            }
        }
    }

    fn run(&self, path: &Path) -> Result<Vec<PageExtraction>> {
        let pages = match self.primary.extract(path) {
            Ok(pages) => pages,
            Err(e) if self.options.fallback_on_structured_error => {
                log::warn!("{} failed ({}), trying {}", self.primary.name(), e, self.fallback.name());
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let pages = if pages.is_empty() {
            log::debug!("{} produced no pages, trying {}", self.primary.name(), self.fallback.name());
            self.fallback.extract(path)?
        } else {
            pages
        };

        self.escalate(path, pages)
    }

    /// Replace every blank page with its OCR result.
    fn escalate(&self, path: &Path, pages: Vec<PageExtraction>) -> Result<Vec<PageExtraction>> {
        pages
            .into_iter()
            .map(|page| match PageOutcome::triage(page) {
                PageOutcome::Keep(page) => Ok(page),
                PageOutcome::Escalate(page_number) => {
                    log::debug!("page {} has no text, escalating to OCR", page_number);
                    self.recognizer.recognize_page(path, page_number)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ExtractionMethod, StructuredContent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Result<Vec<PageExtraction>>);

    impl PageSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, _path: &Path) -> Result<Vec<PageExtraction>> {
            match &self.0 {
                Ok(pages) => Ok(pages.clone()),
                Err(e) => Err(Error::Other(e.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct CountingOcr(Arc<AtomicUsize>);

    impl PageRecognizer for CountingOcr {
        fn recognize_page(&self, _path: &Path, page_number: u32) -> Result<PageExtraction> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PageExtraction::ocr(page_number, format!("ocr {page_number}"), 0.8))
        }
    }

    fn structured(n: u32, text: &str) -> PageExtraction {
        PageExtraction::structured(
            n,
            StructuredContent {
                text: text.to_string(),
                tables: vec![vec![vec!["cell".to_string()]]],
            },
            1.0,
        )
    }

    #[test]
    fn test_triage() {
        assert!(matches!(PageOutcome::triage(structured(1, "x")), PageOutcome::Keep(_)));
        assert_eq!(PageOutcome::triage(structured(4, " \n ")), PageOutcome::Escalate(4));
    }

    #[test]
    fn test_blank_page_replaced_wholesale() {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = PdfExtractor::new()
            .with_primary(Fixed(Ok(vec![structured(1, "Hello"), structured(2, "  ")])))
            .with_recognizer(CountingOcr(calls.clone()));

        let result = extractor.extract("doc.pdf");
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.pages[1].method, ExtractionMethod::Ocr);
        assert!(result.pages[1].content.tables().is_empty());
        assert_eq!(result.text, "Hello\n\nocr 2");
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_empty_structured_uses_fallback() {
        let extractor = PdfExtractor::new()
            .with_primary(Fixed(Ok(vec![])))
            .with_fallback(Fixed(Ok(vec![PageExtraction::text(1, "plain".into(), 0.1)])))
            .with_recognizer(CountingOcr::default());

        let result = extractor.extract("doc.pdf");
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].method, ExtractionMethod::Text);
    }

    #[test]
    fn test_structured_error_does_not_fall_back_by_default() {
        let primary = || Fixed(Err(Error::Other("broken page tree".into())));
        let fallback = || Fixed(Ok(vec![PageExtraction::text(1, "plain".into(), 0.1)]));

        let result = PdfExtractor::new()
            .with_primary(primary())
            .with_fallback(fallback())
            .extract("doc.pdf");
        assert!(!result.is_ok());
        assert!(result.pages.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.error.unwrap().stage, Stage::PDF_PIPELINE);

        let options = PdfOptions::new().with_fallback_on_structured_error(true);
        let result = PdfExtractor::with_options(options)
            .with_primary(primary())
            .with_fallback(fallback())
            .extract("doc.pdf");
        assert!(result.is_ok());
        assert_eq!(result.text, "plain");
    }
}
