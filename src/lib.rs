//! # docex
//!
//! Confidence-scored text and table extraction from PDF and DOCX files.
//!
//! PDF pages are read layout-aware from the content stream first; pages that
//! come out blank are rasterized and run through OCR. DOCX files are split
//! into paragraph, list, table, header, footer and text-run blocks. Every
//! result carries a heuristic confidence, timing and peak memory, and never
//! an `Err`: failures are folded into the record's `error` field.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docex::{extract_pdf, render};
//!
//! fn main() -> docex::Result<()> {
//!     let result = extract_pdf("scan.pdf");
//!     if let Some(err) = &result.error {
//!         eprintln!("failed at {}: {}", err.stage, err.message);
//!     }
//!     println!("{}", render::to_json(&result, render::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Page-level OCR escalation**: only pages without text are rasterized
//! - **Stream-mode tables**: tables detected from text alignment alone
//! - **DOCX blocks**: styles, merged table cells, section headers/footers
//! - **Batch runs**: bounded worker pool with per-file soft deadlines

pub mod batch;
pub mod confidence;
pub mod detect;
pub mod docx;
pub mod error;
pub mod evaluate;
pub mod instrument;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod registry;
pub mod render;

pub use batch::{
    collect_inputs, BatchConfig, BatchInput, BatchRecord, BatchReport, BatchRunner, BatchSummary,
    JsonDirSink, RecordSink,
};
pub use detect::{sniff_bytes, sniff_path, DocumentKind};
pub use docx::{DocxExtractor, DocxOptions, TextboxPass};
pub use error::{Error, Result};
pub use model::{
    BlockMetadata, BlockType, DocxBlock, DocxExtractionResult, ExtractionError,
    ExtractionMethod, ExtractionOutcome, PageContent, PageExtraction, PdfExtractionResult, Stage,
    StructuredContent, TableRows,
};
pub use pdf::{OcrOptions, PdfExtractor, PdfOptions};
pub use registry::{DocumentExtractor, ExtractorOptions, ExtractorRegistry};
pub use render::JsonFormat;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extract a PDF with default options.
///
/// # Example
///
/// ```no_run
/// let result = docex::extract_pdf("report.pdf");
/// for page in &result.pages {
///     println!("page {} via {} ({:.2})", page.page_number, page.method, page.confidence);
/// }
/// ```
pub fn extract_pdf<P: AsRef<Path>>(path: P) -> PdfExtractionResult {
    PdfExtractor::new().extract(path)
}

/// Extract a DOCX with default options.
///
/// # Example
///
/// ```no_run
/// let result = docex::extract_docx("resume.docx");
/// println!("{} blocks", result.blocks.len());
/// ```
pub fn extract_docx<P: AsRef<Path>>(path: P) -> DocxExtractionResult {
    DocxExtractor::new().extract(path)
}

/// Extract a PDF or DOCX, chosen by extension.
///
/// Returns [`Error::UnsupportedFormat`] for any other extension.
pub fn extract<P: AsRef<Path>>(path: P) -> Result<ExtractionOutcome> {
    ExtractorRegistry::with_defaults().extract(path.as_ref())
}

/// Builder for configured extractors and batch runs.
///
/// # Example
///
/// ```no_run
/// use docex::Docex;
/// use std::time::Duration;
///
/// let docex = Docex::new()
///     .with_base_dir("/data/inbox")
///     .with_ocr_language("eng")
///     .with_workers(8)
///     .with_timeout(Duration::from_secs(120));
///
/// let outcome = docex.extract("contracts/lease.pdf")?;
/// println!("{:.2}", outcome.confidence());
/// # Ok::<(), docex::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Docex {
    options: ExtractorOptions,
    batch: BatchConfig,
}

impl Docex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative input paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_base_dir(dir);
        self
    }

    /// Replace the OCR settings.
    pub fn with_ocr(mut self, ocr: OcrOptions) -> Self {
        self.options = self.options.with_ocr(ocr);
        self
    }

    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.options.ocr = self.options.ocr.with_language(language);
        self
    }

    /// Worker threads for batch runs.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.batch = self.batch.with_max_workers(workers);
        self
    }

    /// Per-file deadline for batch runs.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.batch = self.batch.with_timeout(timeout);
        self
    }

    pub fn registry(&self) -> ExtractorRegistry {
        ExtractorRegistry::from_options(&self.options)
    }

    /// Extract one file.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionOutcome> {
        self.registry().extract(path.as_ref())
    }

    /// A batch runner with this configuration.
    pub fn batch_runner(&self) -> BatchRunner {
        BatchRunner::new(self.registry(), self.batch.clone())
    }
}
