//! PDF object access.
//!
//! Isolates the concrete PDF library (lopdf) from the extractors: opening,
//! page enumeration, content streams, font encodings and the library's own
//! text extraction.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::detect::{sniff_path, DocumentKind};
use crate::error::{Error, Result};

/// An opened PDF.
pub struct PdfDocument {
    doc: LopdfDocument,
}

impl PdfDocument {
    /// Open a PDF file.
    ///
    /// Every failure to get at the document (missing file, wrong signature,
    /// broken cross-reference table, unsupported encryption) is reported as
    /// [`Error::CorruptedDocument`].
    pub fn open(path: &Path) -> Result<Self> {
        match sniff_path(path) {
            Ok(Some(DocumentKind::Pdf)) => {}
            Ok(_) => {
                return Err(Error::CorruptedDocument(format!(
                    "{} is not a PDF file (no %PDF- header)",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(Error::CorruptedDocument(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        let doc = LopdfDocument::load(path).map_err(|e| {
            Error::CorruptedDocument(format!("failed to open PDF {}: {}", path.display(), e))
        })?;

        if doc.is_encrypted() {
            log::warn!("{} is encrypted; text may not decode", path.display());
        }

        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)
            .map_err(|e| Error::CorruptedDocument(format!("failed to open PDF: {}", e)))?;
        Ok(Self { doc })
    }

    /// Page numbers (1-indexed) mapped to page object ids, in page order.
    pub fn pages(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// PDF version string from the file header.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    pub(crate) fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            Error::Pdf(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    /// Font resources of a page: resource name → (base font, encoding).
    pub(crate) fn page_fonts(&self, page_id: ObjectId) -> Result<BTreeMap<Vec<u8>, PageFont<'_>>> {
        let fonts = self.doc.get_page_fonts(page_id)?;
        let mut result = BTreeMap::new();
        for (name, dict) in fonts {
            let base_font = dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            result.insert(name, PageFont { base_font, dict });
        }
        Ok(result)
    }

    /// Decompressed content stream bytes of a page.
    ///
    /// A page without `/Contents` is blank and yields an empty stream.
    pub(crate) fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => stream_bytes(s),
                Object::Array(arr) => self.concat_streams(arr),
                _ => Err(Error::Pdf("invalid content stream".to_string())),
            },
            Object::Array(arr) => self.concat_streams(arr),
            _ => Err(Error::Pdf("invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Object::Stream(s) = self.doc.get_object(*r)? {
                    content.extend_from_slice(&stream_bytes(s)?);
                    content.push(b' ');
                }
            }
        }
        Ok(content)
    }

    /// Page text through lopdf's own extractor.
    ///
    /// Decodes every show-text operator in stream order through the font's
    /// encoding and breaks lines at each text object, without any geometry.
    pub fn plain_text(&self, page_number: u32) -> Result<String> {
        Ok(self.doc.extract_text(&[page_number])?)
    }

    /// Decode a string operand with a font's encoding, falling back to
    /// [`decode_text_simple`] when the font has none.
    pub(crate) fn decode(&self, font: Option<&PageFont<'_>>, bytes: &[u8]) -> String {
        if let Some(font) = font {
            if let Ok(encoding) = font.dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }
}

/// Stream payload, decoded through its filters. A stream without `/Filter`
/// is stored as-is.
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// A font resource of a page.
pub(crate) struct PageFont<'a> {
    pub base_font: String,
    dict: &'a Dictionary,
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn test_open_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "not a pdf at all").unwrap();

        let err = PdfDocument::open(&path).err().unwrap();
        assert!(matches!(err, Error::CorruptedDocument(_)));
    }

    fn one_page_pdf(streams: Vec<Stream>) -> PdfDocument {
        use lopdf::dictionary;

        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let contents: Vec<Object> = streams
            .into_iter()
            .map(|s| Object::Reference(doc.add_object(s)))
            .collect();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        PdfDocument::from_bytes(&buf).unwrap()
    }

    #[test]
    fn test_unfiltered_content_stream() {
        let raw = b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET".to_vec();
        let pdf = one_page_pdf(vec![Stream::new(lopdf::dictionary! {}, raw.clone())]);

        let id = pdf.page_id(1).unwrap();
        let content = pdf.page_content(id).unwrap();
        assert!(content.starts_with(&raw));
    }

    #[test]
    fn test_compressed_and_plain_streams_concatenate() {
        let first = "(first) Tj ".repeat(50);
        let mut compressed = Stream::new(lopdf::dictionary! {}, first.into_bytes());
        compressed.compress().unwrap();
        assert!(compressed.dict.has(b"Filter"));
        let plain = Stream::new(lopdf::dictionary! {}, b"(second) Tj".to_vec());

        let pdf = one_page_pdf(vec![compressed, plain]);
        let content = pdf.page_content(pdf.page_id(1).unwrap()).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("(first) Tj"));
        assert!(text.contains("(second) Tj"));
    }

    #[test]
    fn test_open_missing_file() {
        let err = PdfDocument::open(Path::new("/nonexistent/doc.pdf"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::CorruptedDocument(_)));
    }
}
