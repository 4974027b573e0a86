//! The DOCX container: main document, styles and header/footer parts.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use super::xml::{self, Element};
use crate::detect::{sniff_path, DocumentKind};
use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Paragraph style names keyed by style id.
#[derive(Debug, Clone)]
pub struct StyleMap {
    names: HashMap<String, String>,
    default: String,
}

impl Default for StyleMap {
    fn default() -> Self {
        Self {
            names: HashMap::new(),
            default: "Normal".to_string(),
        }
    }
}

impl StyleMap {
    pub fn from_xml(root: &Element) -> Self {
        let mut map = Self::default();
        for style in root.children_named("w:style") {
            if style.attr("w:type") != Some("paragraph") {
                continue;
            }
            let (Some(id), Some(name)) = (
                style.attr("w:styleId"),
                style.child("w:name").and_then(|n| n.attr("w:val")),
            ) else {
                continue;
            };
            let name = ui_name(name);
            if matches!(style.attr("w:default"), Some("1") | Some("true")) {
                map.default = name.clone();
            }
            map.names.insert(id.to_string(), name);
        }
        map
    }

    /// Name for a paragraph's style id; the default paragraph style when
    /// the id is absent or unknown.
    pub fn resolve(&self, style_id: Option<&str>) -> &str {
        style_id
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Word stores some built-in style names in lowercase; show them the way
/// the Word UI does.
fn ui_name(name: &str) -> String {
    match name {
        "caption" => "Caption".to_string(),
        "header" => "Header".to_string(),
        "footer" => "Footer".to_string(),
        "title" => "Title".to_string(),
        "subtitle" => "Subtitle".to_string(),
        _ => match name.strip_prefix("heading ") {
            Some(level) if level.chars().all(|c| c.is_ascii_digit()) => format!("Heading {level}"),
            _ => name.to_string(),
        },
    }
}

/// An opened DOCX package with its main part parsed.
pub struct DocxPackage<R = File> {
    archive: ZipArchive<R>,
    document: Element,
    styles: StyleMap,
    /// Relationship id → part name
    relationships: HashMap<String, String>,
}

impl DocxPackage<File> {
    /// Open a DOCX file. Any failure to read the container or its main part
    /// is a [`Error::CorruptedDocument`].
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_inner(path).map_err(|e| {
            let reason = match e {
                Error::CorruptedDocument(msg) if msg.starts_with("Failed to open DOCX") => {
                    return Error::CorruptedDocument(msg)
                }
                Error::CorruptedDocument(msg) => msg,
                other => other.to_string(),
            };
            Error::CorruptedDocument(format!("Failed to open DOCX: {}", reason))
        })
    }

    fn open_inner(path: &Path) -> Result<Self> {
        if sniff_path(path)? != Some(DocumentKind::Docx) {
            return Err(Error::CorruptedDocument(format!(
                "Failed to open DOCX: {} is not a ZIP package",
                path.display()
            )));
        }
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> DocxPackage<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let document = match read_part(&mut archive, DOCUMENT_PART)? {
            Some(xml) => xml::parse(&xml)?,
            None => {
                return Err(Error::CorruptedDocument(format!(
                    "Failed to open DOCX: missing {}",
                    DOCUMENT_PART
                )))
            }
        };

        let styles = match read_part(&mut archive, STYLES_PART)? {
            Some(xml) => StyleMap::from_xml(&xml::parse(&xml)?),
            None => StyleMap::default(),
        };

        let relationships = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
            Some(xml) => parse_relationships(&xml::parse(&xml)?),
            None => HashMap::new(),
        };

        Ok(Self {
            archive,
            document,
            styles,
            relationships,
        })
    }

    /// The `w:document` root.
    pub fn document(&self) -> &Element {
        &self.document
    }

    /// The `w:body` element.
    pub fn body(&self) -> Result<&Element> {
        self.document
            .child("w:body")
            .ok_or_else(|| Error::CorruptedDocument("document has no w:body".to_string()))
    }

    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    /// Parse the part a relationship id points at.
    ///
    /// A relationship or part that does not exist yields `None`.
    pub fn related_part(&mut self, rel_id: &str) -> Result<Option<Element>> {
        let Some(part) = self.relationships.get(rel_id).cloned() else {
            log::debug!("docx: no relationship {}", rel_id);
            return Ok(None);
        };
        match read_part(&mut self.archive, &part)? {
            Some(xml) => Ok(Some(xml::parse(&xml)?)),
            None => {
                log::debug!("docx: part {} is missing", part);
                Ok(None)
            }
        }
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Relationship ids mapped to part names inside the package.
fn parse_relationships(root: &Element) -> HashMap<String, String> {
    root.children_named("Relationship")
        .filter(|rel| rel.attr("TargetMode") != Some("External"))
        .filter_map(|rel| {
            let id = rel.attr("Id")?;
            let target = rel.attr("Target")?;
            let part = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("word/{}", target),
            };
            Some((id.to_string(), part))
        })
        .collect()
}
