//! DOCX block types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ExtractionError, TableRows};
use crate::confidence::mean_confidence;
use crate::instrument::Measurement;

/// Kind of structural block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Paragraph,
    List,
    Table,
    Header,
    Footer,
    Textbox,
}

impl BlockType {
    /// Fixed confidence assigned to every block of this type.
    pub fn confidence(&self) -> f64 {
        match self {
            BlockType::Table => 0.95,
            BlockType::Textbox => 0.85,
            BlockType::Paragraph | BlockType::List | BlockType::Header | BlockType::Footer => 0.90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::List => "list",
            BlockType::Table => "table",
            BlockType::Header => "header",
            BlockType::Footer => "footer",
            BlockType::Textbox => "textbox",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-block metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockMetadata {
    /// Row×cell matrix of a table block
    Table { rows: TableRows },
    /// Source style name of a paragraph or list block
    Style { style: String },
    /// No metadata; serializes as `{}`
    Plain {},
}

impl BlockMetadata {
    /// Table rows, if this is table metadata.
    pub fn rows(&self) -> Option<&TableRows> {
        match self {
            BlockMetadata::Table { rows } => Some(rows),
            _ => None,
        }
    }

    /// Style name, if this is paragraph metadata.
    pub fn style(&self) -> Option<&str> {
        match self {
            BlockMetadata::Style { style } => Some(style),
            _ => None,
        }
    }
}

/// One structural block of a DOCX document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocxBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub text: String,
    pub metadata: BlockMetadata,
    pub confidence: f64,
}

impl DocxBlock {
    /// Paragraph or list block, depending on the style name.
    pub fn paragraph(text: String, style: String) -> Self {
        let kind = if style.contains("List") {
            BlockType::List
        } else {
            BlockType::Paragraph
        };
        Self::new(kind, text, BlockMetadata::Style { style })
    }

    pub fn table(rows: TableRows) -> Self {
        Self::new(BlockType::Table, String::new(), BlockMetadata::Table { rows })
    }

    pub fn header(text: String) -> Self {
        Self::new(BlockType::Header, text, BlockMetadata::Plain {})
    }

    pub fn footer(text: String) -> Self {
        Self::new(BlockType::Footer, text, BlockMetadata::Plain {})
    }

    pub fn textbox(text: String) -> Self {
        Self::new(BlockType::Textbox, text, BlockMetadata::Plain {})
    }

    fn new(kind: BlockType, text: String, metadata: BlockMetadata) -> Self {
        Self {
            kind,
            text,
            metadata,
            confidence: kind.confidence(),
        }
    }
}

/// Document-level result for one DOCX input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocxExtractionResult {
    /// Non-empty block texts joined with a blank line
    pub text: String,
    /// Blocks in emission order
    pub blocks: Vec<DocxBlock>,
    /// Mean block confidence (0.0 when there are no blocks)
    pub confidence: f64,
    /// Wall-clock seconds
    pub time_taken: f64,
    /// Peak additional memory in MB
    pub memory_mb: f64,
    /// Set when the document failed
    pub error: Option<ExtractionError>,
}

impl DocxExtractionResult {
    /// Build a successful result from the emitted blocks.
    pub fn from_blocks(blocks: Vec<DocxBlock>, measurement: Measurement) -> Self {
        let text = blocks
            .iter()
            .filter(|b| !b.text.is_empty())
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let confidence = mean_confidence(blocks.iter().map(|b| b.confidence));

        Self {
            text,
            blocks,
            confidence,
            time_taken: measurement.time_taken,
            memory_mb: measurement.memory_mb,
            error: None,
        }
    }

    /// Build a fail-closed result.
    pub fn failed(error: ExtractionError, measurement: Measurement) -> Self {
        Self {
            text: String::new(),
            blocks: Vec::new(),
            confidence: 0.0,
            time_taken: measurement.time_taken,
            memory_mb: measurement.memory_mb,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Blocks of the given type.
    pub fn blocks_of(&self, kind: BlockType) -> impl Iterator<Item = &DocxBlock> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }
}
