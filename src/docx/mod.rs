//! DOCX block extraction.
//!
//! Blocks come out in a fixed order: body paragraphs, body tables, section
//! headers and footers, then a text-run pass. Document position is not
//! interleaved across those groups.

mod package;
mod xml;

use std::path::{Path, PathBuf};

pub use package::{DocxPackage, StyleMap};
pub use xml::{paragraph_text, text_runs, Element, Node};

use crate::detect::{resolve_input, DocumentKind};
use crate::error::{Error, Result};
use crate::instrument::Meter;
use crate::model::{DocxBlock, DocxExtractionResult, ExtractionError, Stage, TableRows};

/// Which runs the final text-run pass emits as `textbox` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextboxPass {
    /// Every `w:t` under each body paragraph, which repeats ordinary
    /// paragraph text run by run.
    #[default]
    AllRuns,
    /// Only runs inside text boxes (`w:txbxContent`).
    FloatingOnly,
}

/// Options for [`DocxExtractor`].
#[derive(Debug, Clone, Default)]
pub struct DocxOptions {
    /// Directory relative input paths are resolved against.
    pub base_dir: Option<PathBuf>,
    pub textbox_pass: TextboxPass,
}

impl DocxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_textbox_pass(mut self, pass: TextboxPass) -> Self {
        self.textbox_pass = pass;
        self
    }
}

/// Extracts structural blocks from Word documents.
#[derive(Debug, Clone, Default)]
pub struct DocxExtractor {
    options: DocxOptions,
}

impl DocxExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DocxOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DocxOptions {
        &self.options
    }

    /// Extract a document. Never fails: errors come back inside the result.
    pub fn extract(&self, path: impl AsRef<Path>) -> DocxExtractionResult {
        let meter = Meter::start();
        let path = resolve_input(self.options.base_dir.as_deref(), path.as_ref());

        match self.extract_blocks(&path) {
            Ok(blocks) => {
                let result = DocxExtractionResult::from_blocks(blocks, meter.finish());
                log::info!(
                    "{}: {} blocks, confidence {:.2}",
                    path.display(),
                    result.blocks.len(),
                    result.confidence
                );
                result
            }
            Err(e) => {
                log::warn!("{}: extraction failed: {}", path.display(), e);
                DocxExtractionResult::failed(
                    ExtractionError::from_error(&e, Stage::DOCX_PIPELINE),
                    meter.finish(),
                )
            }
        }
    }

    /// All blocks of a document, or the first failure.
    pub fn extract_blocks(&self, path: &Path) -> Result<Vec<DocxBlock>> {
        if DocumentKind::from_path(path) != Some(DocumentKind::Docx) {
            return Err(Error::UnsupportedFormat(path.display().to_string()));
        }

        let mut package = DocxPackage::open(path)?;
        self.blocks_from_package(&mut package)
    }

    pub fn blocks_from_package<R>(&self, package: &mut DocxPackage<R>) -> Result<Vec<DocxBlock>>
    where
        R: std::io::Read + std::io::Seek,
    {
        let body = package.body()?.clone();
        let mut blocks = Vec::new();

        for p in body.children_named("w:p") {
            let text = paragraph_text(p).trim().to_string();
            if text.is_empty() {
                continue;
            }
            let style_id = p.path(&["w:pPr", "w:pStyle"]).and_then(|s| s.attr("w:val"));
            let style = package.styles().resolve(style_id).to_string();
            blocks.push(DocxBlock::paragraph(text, style));
        }

        for tbl in body.children_named("w:tbl") {
            blocks.push(DocxBlock::table(table_rows(tbl)));
        }

        self.push_headers_and_footers(package, &body, &mut blocks)?;

        let floating_only = self.options.textbox_pass == TextboxPass::FloatingOnly;
        for p in body.children_named("w:p") {
            for run in text_runs(p, floating_only) {
                let run = run.trim();
                if !run.is_empty() {
                    blocks.push(DocxBlock::textbox(run.to_string()));
                }
            }
        }

        Ok(blocks)
    }

    /// One header and one footer block per section, for the section's
    /// default header/footer or the one it inherits.
    fn push_headers_and_footers<R>(
        &self,
        package: &mut DocxPackage<R>,
        body: &Element,
        blocks: &mut Vec<DocxBlock>,
    ) -> Result<()>
    where
        R: std::io::Read + std::io::Seek,
    {
        let mut header: Option<String> = None;
        let mut footer: Option<String> = None;

        for sect in section_properties(body) {
            if let Some(id) = default_reference(sect, "w:headerReference") {
                header = Some(part_text(package, id)?);
            }
            if let Some(id) = default_reference(sect, "w:footerReference") {
                footer = Some(part_text(package, id)?);
            }

            if let Some(text) = header.as_ref().filter(|t| !t.is_empty()) {
                blocks.push(DocxBlock::header(text.clone()));
            }
            if let Some(text) = footer.as_ref().filter(|t| !t.is_empty()) {
                blocks.push(DocxBlock::footer(text.clone()));
            }
        }

        Ok(())
    }
}

/// Every `w:sectPr` in document order: those closing a section inside a
/// paragraph's properties, then the body's final one.
fn section_properties(body: &Element) -> Vec<&Element> {
    let mut sections = Vec::new();
    for child in body.elements() {
        match child.name.as_str() {
            "w:p" => {
                if let Some(sect) = child.path(&["w:pPr", "w:sectPr"]) {
                    sections.push(sect);
                }
            }
            "w:sectPr" => sections.push(child),
            _ => {}
        }
    }
    sections
}

fn default_reference<'a>(sect: &'a Element, kind: &str) -> Option<&'a str> {
    sect.children_named(kind)
        .find(|r| r.attr("w:type").unwrap_or("default") == "default")
        .and_then(|r| r.attr("r:id"))
}

/// Non-empty paragraphs of a header/footer part, one per line. A missing
/// part reads as empty.
fn part_text<R>(package: &mut DocxPackage<R>, rel_id: &str) -> Result<String>
where
    R: std::io::Read + std::io::Seek,
{
    let Some(part) = package.related_part(rel_id)? else {
        return Ok(String::new());
    };
    Ok(part
        .children_named("w:p")
        .map(paragraph_text)
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// A table as a row x cell matrix over the grid columns.
///
/// A cell spanning several grid columns repeats its text in each; a
/// vertically merged continuation cell repeats the text of the cell above.
fn table_rows(tbl: &Element) -> TableRows {
    let mut rows: TableRows = Vec::new();

    for tr in tbl.children_named("w:tr") {
        let mut row: Vec<String> = Vec::new();
        for tc in tr.children_named("w:tc") {
            let span = tc
                .path(&["w:tcPr", "w:gridSpan"])
                .and_then(|g| g.attr("w:val"))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let continues = tc
                .path(&["w:tcPr", "w:vMerge"])
                .is_some_and(|m| m.attr("w:val").unwrap_or("continue") == "continue");

            let col = row.len();
            let text = if continues {
                rows.last()
                    .and_then(|above| above.get(col))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell_text(tc)
            };
            row.extend(std::iter::repeat(text).take(span));
        }
        rows.push(row);
    }

    rows
}

fn cell_text(tc: &Element) -> String {
    tc.children_named("w:p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
