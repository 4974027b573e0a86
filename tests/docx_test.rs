//! Integration tests for DOCX block extraction.

mod common;

use common::{para, style, write_docx, DocxParts};
use docex::{BlockType, DocxExtractor, DocxOptions, Stage, TextboxPass};
use tempfile::TempDir;

const SECTION: &str = r#"<w:sectPr><w:headerReference w:type="default" r:id="rId1"/><w:footerReference w:type="default" r:id="rId2"/></w:sectPr>"#;

const TABLE: &str = r#"<w:tbl>
    <w:tr>
        <w:tc><w:p><w:r><w:t>Quarter</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Revenue</w:t></w:r></w:p></w:tc>
    </w:tr>
    <w:tr>
        <w:tc><w:p><w:r><w:t>Q1</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>1.2M</w:t></w:r></w:p></w:tc>
    </w:tr>
</w:tbl>"#;

fn report_parts() -> DocxParts {
    DocxParts {
        body: [
            para(Some("Heading1"), "Annual Report"),
            para(None, "Intro text"),
            para(Some("ListBullet"), "First item"),
            para(None, "   "),
            TABLE.to_string(),
            SECTION.to_string(),
        ]
        .concat(),
        styles: Some(
            [
                style("Heading1", "heading 1"),
                style("ListBullet", "List Bullet"),
            ]
            .concat(),
        ),
        headers: vec![
            ("rId1", "header1.xml", para(None, "Company Confidential")),
            ("rId2", "footer1.xml", para(None, "Page footer")),
        ],
    }
}

#[test]
fn test_blocks_in_emission_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.docx");
    write_docx(&path, &report_parts());

    let result = DocxExtractor::new().extract(&path);
    assert!(result.is_ok(), "{:?}", result.error);

    let kinds: Vec<BlockType> = result.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockType::Paragraph,
            BlockType::Paragraph,
            BlockType::List,
            BlockType::Table,
            BlockType::Header,
            BlockType::Footer,
            BlockType::Textbox,
            BlockType::Textbox,
            BlockType::Textbox,
        ]
    );

    assert_eq!(result.blocks[0].text, "Annual Report");
    assert_eq!(result.blocks[0].metadata.style(), Some("Heading 1"));
    assert_eq!(result.blocks[1].metadata.style(), Some("Normal"));
    assert_eq!(result.blocks[2].metadata.style(), Some("List Bullet"));
    assert_eq!(result.blocks[4].text, "Company Confidential");
    assert_eq!(result.blocks[5].text, "Page footer");
}

#[test]
fn test_table_block_carries_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.docx");
    write_docx(&path, &report_parts());

    let result = DocxExtractor::new().extract(&path);
    let table = result.blocks_of(BlockType::Table).next().unwrap();

    assert!(table.text.is_empty());
    assert_eq!(table.confidence, 0.95);
    assert_eq!(
        table.metadata.rows().unwrap(),
        &vec![
            vec!["Quarter".to_string(), "Revenue".to_string()],
            vec!["Q1".to_string(), "1.2M".to_string()],
        ]
    );
}

#[test]
fn test_two_by_three_table_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.docx");
    let cell = |text: &str| format!("<w:tc>{}</w:tc>", para(None, text));
    let row = |cells: [&str; 3]| format!("<w:tr>{}</w:tr>", cells.map(&cell).concat());
    let body = format!(
        "<w:tbl>{}{}</w:tbl>",
        row(["Name", "Role", "Office"]),
        row(["Ada", "Engineer", ""]),
    );
    write_docx(
        &path,
        &DocxParts {
            body,
            ..Default::default()
        },
    );

    let result = DocxExtractor::new().extract(&path);
    assert!(result.is_ok(), "{:?}", result.error);
    let tables: Vec<_> = result.blocks_of(BlockType::Table).collect();
    assert_eq!(tables.len(), 1);

    let rows = tables[0].metadata.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.len() == 3));
    assert_eq!(rows[0], vec!["Name", "Role", "Office"]);
    assert_eq!(rows[1], vec!["Ada", "Engineer", ""]);
}

#[test]
fn test_document_text_and_confidence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.docx");
    write_docx(&path, &report_parts());

    let result = DocxExtractor::new().extract(&path);

    // The table block has no text and is skipped when joining
    assert!(result.text.starts_with("Annual Report\n\nIntro text\n\nFirst item\n\nCompany Confidential"));
    assert!(!result.text.contains("\n\n\n\n"));

    let expected = (0.90 * 5.0 + 0.95 + 0.85 * 3.0) / 9.0;
    assert!((result.confidence - expected).abs() < 0.01);
}

#[test]
fn test_floating_only_textbox_pass() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flyer.docx");
    let body = concat!(
        r#"<w:p><w:r><w:t>Anchor</w:t></w:r><w:r><w:drawing><wps:txbx><w:txbxContent>"#,
        r#"<w:p><w:r><w:t>Boxed</w:t></w:r></w:p>"#,
        r#"</w:txbxContent></wps:txbx></w:drawing></w:r></w:p>"#
    );
    write_docx(
        &path,
        &DocxParts {
            body: body.to_string(),
            ..Default::default()
        },
    );

    let all = DocxExtractor::new().extract(&path);
    let texts: Vec<&str> = all
        .blocks_of(BlockType::Textbox)
        .map(|b| b.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Anchor", "Boxed"]);
    assert_eq!(all.blocks[0].text, "Anchor");

    let floating = DocxExtractor::with_options(
        DocxOptions::new().with_textbox_pass(TextboxPass::FloatingOnly),
    )
    .extract(&path);
    let texts: Vec<&str> = floating
        .blocks_of(BlockType::Textbox)
        .map(|b| b.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Boxed"]);
}

#[test]
fn test_sections_inherit_headers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sections.docx");
    let first_section = r#"<w:p><w:pPr><w:sectPr><w:headerReference w:type="default" r:id="rId1"/></w:sectPr></w:pPr></w:p>"#;
    let body = [
        para(None, "Part one"),
        first_section.to_string(),
        para(None, "Part two"),
        "<w:sectPr/>".to_string(),
    ]
    .concat();
    write_docx(
        &path,
        &DocxParts {
            body,
            headers: vec![("rId1", "header1.xml", para(None, "Running head"))],
            ..Default::default()
        },
    );

    let result = DocxExtractor::new().extract(&path);
    assert!(result.is_ok(), "{:?}", result.error);
    let headers: Vec<&str> = result
        .blocks_of(BlockType::Header)
        .map(|b| b.text.as_str())
        .collect();
    assert_eq!(headers, vec!["Running head", "Running head"]);
    assert_eq!(result.blocks_of(BlockType::Footer).count(), 0);
}

#[test]
fn test_missing_header_part_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dangling.docx");
    let body = [
        para(None, "Body"),
        r#"<w:sectPr><w:headerReference w:type="default" r:id="rId9"/></w:sectPr>"#.to_string(),
    ]
    .concat();
    write_docx(
        &path,
        &DocxParts {
            body,
            ..Default::default()
        },
    );

    let result = DocxExtractor::new().extract(&path);
    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(result.blocks_of(BlockType::Header).count(), 0);
}

#[test]
fn test_corrupt_package_reports_document_open() {
    let dir = TempDir::new().unwrap();
    let path = common::place(dir.path(), "broken.docx", b"PK\x03\x04 truncated");

    let result = DocxExtractor::new().extract(&path);
    let error = result.error.expect("corrupt package should be reported");
    assert_eq!(error.stage, Stage::DOCUMENT_OPEN);
    assert!(error.message.contains("Failed to open DOCX"));
    assert!(result.blocks.is_empty());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_other_extension_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.doc");
    write_docx(&path, &report_parts());

    let result = DocxExtractor::new().extract(&path);
    assert_eq!(result.error.unwrap().stage, Stage::UNSUPPORTED_FORMAT);
}
