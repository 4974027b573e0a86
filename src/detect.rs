//! Input detection: document kind from extension or signature, and input
//! path resolution.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// ZIP local file header, the first bytes of every OOXML package
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Readers accept a PDF header anywhere in the first KiB
const PDF_HEADER_WINDOW: usize = 1024;

/// The document formats docex extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Lowercase extensions (without the dot) handled for this kind.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DocumentKind::Pdf => &["pdf"],
            DocumentKind::Docx => &["docx"],
        }
    }

    /// Kind for a file extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    /// Kind for a path, judged by its extension only.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess the container kind from leading bytes.
///
/// A ZIP signature is reported as [`DocumentKind::Docx`]; whether the archive
/// really is a Word package is only known once it is opened.
pub fn sniff_bytes(data: &[u8]) -> Option<DocumentKind> {
    if data.starts_with(ZIP_MAGIC) {
        return Some(DocumentKind::Docx);
    }
    let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Some(DocumentKind::Pdf);
    }
    None
}

/// Guess the container kind of a file from its first bytes.
pub fn sniff_path(path: &Path) -> Result<Option<DocumentKind>> {
    let mut header = Vec::with_capacity(PDF_HEADER_WINDOW);
    File::open(path)?
        .take(PDF_HEADER_WINDOW as u64)
        .read_to_end(&mut header)?;
    Ok(sniff_bytes(&header))
}

/// PDF version from a header such as `%PDF-1.7`.
pub fn pdf_version(data: &[u8]) -> Option<String> {
    let start = data.windows(PDF_MAGIC.len()).position(|w| w == PDF_MAGIC)? + PDF_MAGIC.len();
    let version = data.get(start..start + 3)?;
    let valid = version[0].is_ascii_digit() && version[1] == b'.' && version[2].is_ascii_digit();
    valid.then(|| String::from_utf8_lossy(version).into_owned())
}

/// Resolve an input path: absolute paths are kept, relative ones are joined
/// onto `base_dir` when one is configured.
pub fn resolve_input(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}
