//! Benchmarks for docex extraction.
//!
//! Run with: cargo bench
//!
//! PDFs are generated in memory, so no OCR tools are needed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use docex::confidence::alpha_ratio;
use docex::parser::{PdfDocument, TableDetector, TextSpan};
use docex::pdf::StructuredExtractor;

/// A PDF where every page carries a paragraph and a small aligned table.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
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

    let mut kids = Vec::with_capacity(page_count);
    for i in 0..page_count {
        let mut operations = Vec::new();
        let mut show = |x: i64, y: i64, text: String| {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        };

        show(72, 740, format!("Page {} - benchmark content for docex", i + 1));
        show(72, 720, "Structured extraction reads the content stream directly.".to_string());
        for row in 0..6 {
            let y = 650 - row * 18;
            show(72, y, format!("Item {}", row));
            show(220, y, format!("{}", row * 17));
            show(340, y, format!("{}.00", row * 3));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

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

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1);
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("sniff_pdf", |b| {
        b.iter(|| docex::sniff_bytes(black_box(&pdf_data)));
    });

    c.bench_function("sniff_unknown", |b| {
        b.iter(|| docex::sniff_bytes(black_box(non_pdf_data)));
    });
}

fn bench_structured_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("structured_extraction");
    let extractor = StructuredExtractor::new();

    for page_count in [1, 5, 10].iter() {
        let data = create_test_pdf(*page_count);

        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| {
                let doc = PdfDocument::from_bytes(black_box(&data)).unwrap();
                extractor.extract_document(&doc).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_table_detection(c: &mut Criterion) {
    let spans: Vec<TextSpan> = (0..40)
        .flat_map(|row| {
            let y = 760.0 - row as f32 * 16.0;
            [72.0, 200.0, 330.0, 450.0].into_iter().enumerate().map(move |(col, x)| {
                TextSpan::new(format!("r{}c{}", row, col), x, y, 10.0, "Helvetica".to_string())
            })
        })
        .collect();
    let detector = TableDetector::new();

    c.bench_function("table_detection_40x4", |b| {
        b.iter(|| detector.extract_rows(black_box(&spans)));
    });
}

fn bench_confidence(c: &mut Criterion) {
    let text = "Quarterly revenue grew 12% to $4.1M; operating costs fell. ".repeat(200);

    c.bench_function("alpha_ratio", |b| {
        b.iter(|| alpha_ratio(black_box(&text)));
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_structured_extraction,
    bench_table_detection,
    bench_confidence,
);
criterion_main!(benches);
