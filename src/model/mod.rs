//! Result records produced by the extractors.
//!
//! Every document-level call returns one of these records; failures are
//! folded into the record's `error` field rather than raised.

mod docx;
mod outcome;
mod pdf;
mod status;

pub use docx::{BlockMetadata, BlockType, DocxBlock, DocxExtractionResult};
pub use outcome::ExtractionOutcome;
pub use pdf::{
    ExtractionMethod, PageContent, PageExtraction, PdfExtractionResult, StructuredContent,
    TableRows,
};
pub use status::{ExtractionError, Stage};
