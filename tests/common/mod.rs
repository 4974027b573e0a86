//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// One page of a generated PDF.
pub enum PdfPage {
    /// Lines of text, each `(x, y, text)` in Helvetica 12pt.
    Text(Vec<(i64, i64, &'static str)>),
    /// A page whose content stream only paints a rectangle.
    Graphics,
}

/// Write a PDF with the given pages to `path`.
pub fn write_pdf(path: &Path, pages: &[PdfPage]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|page| {
            let content_id = add_content(&mut doc, page);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn add_content(doc: &mut Document, page: &PdfPage) -> ObjectId {
    let operations = match page {
        PdfPage::Text(lines) => {
            let mut ops = Vec::new();
            for (x, y, text) in lines {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                ops.push(Operation::new("ET", vec![]));
            }
            ops
        }
        PdfPage::Graphics => vec![
            Operation::new("re", vec![72.into(), 72.into(), 200.into(), 300.into()]),
            Operation::new("f", vec![]),
        ],
    };
    let content = Content { operations };
    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
}

/// Parts of a generated DOCX package.
#[derive(Default)]
pub struct DocxParts {
    /// Inner XML of `w:body`
    pub body: String,
    /// Inner XML of `w:styles`, if the package has a styles part
    pub styles: Option<String>,
    /// `(relationship id, part name under word/, inner XML of the root)`
    pub headers: Vec<(&'static str, &'static str, String)>,
}

const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

/// Write a DOCX package built from `parts` to `path`.
pub fn write_docx(path: &Path, parts: &DocxParts) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();

    zip.start_file("word/document.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NS}><w:body>{}</w:body></w:document>"#,
        parts.body
    )
    .unwrap();

    if let Some(styles) = &parts.styles {
        zip.start_file("word/styles.xml", options).unwrap();
        write!(zip, r#"<w:styles {NS}>{}</w:styles>"#, styles).unwrap();
    }

    if !parts.headers.is_empty() {
        let mut rels = String::new();
        for (id, name, xml) in &parts.headers {
            let root = if name.starts_with("footer") { "w:ftr" } else { "w:hdr" };
            zip.start_file(format!("word/{}", name), options).unwrap();
            write!(zip, r#"<{root} {NS}>{xml}</{root}>"#).unwrap();
            rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="{name}"/>"#
            ));
        }
        zip.start_file("word/_rels/document.xml.rels", options).unwrap();
        write!(
            zip,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .unwrap();
    }

    zip.finish().unwrap();
}

/// A paragraph with an optional style id and one run.
pub fn para(style: Option<&str>, text: &str) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
        .unwrap_or_default();
    format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

/// A `w:styles` entry for a paragraph style.
pub fn style(id: &str, name: &str) -> String {
    format!(r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{name}"/></w:style>"#)
}

/// Write `bytes` to `dir/name` and return the path.
pub fn place(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
