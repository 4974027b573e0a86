//! Low-level PDF access: the document backend, positioned text spans and
//! stream-mode table detection.

mod backend;
mod layout;
mod table_detector;

pub use backend::{decode_text_simple, PdfDocument};
pub use layout::{render_lines, Column, LayoutAnalyzer, TextLine, TextSpan};
pub use table_detector::{
    to_rows, DetectedTable, RowSpans, TableDetector, TableDetectorConfig,
};
