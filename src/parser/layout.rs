//! Positioned text from PDF content streams.
//!
//! Interprets the text operators of a page into [`TextSpan`]s, groups spans
//! into reading-order [`TextLine`]s (splitting two-column layouts at the
//! gutter) and renders lines back into page text.

use std::cmp::Ordering;

use lopdf::content::Content;
use lopdf::Object;

use super::backend::PdfDocument;
use crate::error::{Error, Result};

/// Average glyph advance as a fraction of the font size, used when the
/// font's real widths are not consulted.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustments (thousandths of an em) above this are read as word breaks.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A run of text drawn at one position.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g. "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text.chars().count() as f32 * font_size * AVG_GLYPH_WIDTH;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    fn center(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    pub x: f32,
}

impl TextLine {
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        let (x, y) = spans.first().map(|s| (s.x, s.y)).unwrap_or((0.0, 0.0));
        Self { spans, y, x }
    }

    /// Line text, with a space wherever the horizontal gap between spans
    /// reads as a word break.
    ///
    /// No space is inserted between two characters of a script written
    /// without word spaces (Chinese, Japanese).
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();

                let chars = span.text.chars().count();
                let avg_char_width = if chars > 0 && span.width > 0.0 {
                    span.width / chars as f32
                } else {
                    span.font_size * AVG_GLYPH_WIDTH
                };

                let spaceless = prev
                    .text
                    .chars()
                    .last()
                    .is_some_and(is_spaceless_script_char)
                    && span
                        .text
                        .chars()
                        .next()
                        .is_some_and(is_spaceless_script_char);
                let has_space = ends_with_space(&prev.text) || starts_with_space(&span.text);

                if gap > avg_char_width * 0.2 && !spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// A column of a multi-column page.
#[derive(Debug, Clone)]
pub struct Column {
    pub left: f32,
    pub right: f32,
}

impl Column {
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// A span belongs to the column holding its left edge or its center.
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        self.contains(span.x) || self.contains(span.center())
    }
}

/// Extracts positioned text from the pages of one document.
pub struct LayoutAnalyzer<'a> {
    doc: &'a PdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    pub fn new(doc: &'a PdfDocument) -> Self {
        Self { doc }
    }

    /// Interpret a page's content stream into text spans.
    pub fn page_spans(&self, page_number: u32) -> Result<Vec<TextSpan>> {
        let page_id = self.doc.page_id(page_number)?;
        let fonts = self.doc.page_fonts(page_id)?;
        let data = self.doc.page_content(page_id)?;
        let content = Content::decode(&data).map_err(|e| Error::Pdf(e.to_string()))?;

        let mut spans = Vec::new();
        let mut font_key: Vec<u8> = Vec::new();
        let mut font_size: f32 = 12.0;
        let mut matrix = TextMatrix::default();
        let mut in_text_object = false;

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text_object = true;
                    matrix.begin();
                }
                "ET" => in_text_object = false,
                "Tf" => {
                    if let [Object::Name(name), size, ..] = op.operands.as_slice() {
                        font_key = name.clone();
                        font_size = number(size).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(number) {
                        matrix.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = op.operands.as_slice() {
                        let tx = number(tx).unwrap_or(0.0);
                        let ty = number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            matrix.leading = -ty;
                        }
                        matrix.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        let v: Vec<f32> = op.operands.iter().map(|o| number(o).unwrap_or(0.0)).collect();
                        matrix.set(v[0], v[1], v[2], v[3], v[4], v[5]);
                    }
                }
                "T*" => matrix.next_line(),
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "'" || op.operator == "\"" {
                        matrix.next_line();
                    }
                    if !in_text_object {
                        continue;
                    }

                    let font = fonts.get(&font_key);
                    let text = match op.operator.as_str() {
                        "TJ" => match op.operands.first() {
                            Some(Object::Array(items)) => {
                                let mut combined = String::new();
                                for item in items {
                                    match item {
                                        Object::String(bytes, _) => {
                                            combined.push_str(&self.doc.decode(font, bytes))
                                        }
                                        other => {
                                            if let Some(n) = number(other) {
                                                push_word_break(&mut combined, -n);
                                            }
                                        }
                                    }
                                }
                                combined
                            }
                            _ => String::new(),
                        },
                        op_name => {
                            let idx = if op_name == "\"" { 2 } else { 0 };
                            match op.operands.get(idx) {
                                Some(Object::String(bytes, _)) => self.doc.decode(font, bytes),
                                _ => String::new(),
                            }
                        }
                    };

                    if text.trim().is_empty() {
                        continue;
                    }

                    let (x, y) = matrix.position();
                    let font_name = font
                        .map(|f| f.base_font.clone())
                        .unwrap_or_else(|| String::from_utf8_lossy(&font_key).to_string());
                    let span = TextSpan::new(text, x, y, font_size * matrix.scale(), font_name);
                    matrix.advance(span.width);
                    spans.push(span);
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    /// Group spans into lines in reading order.
    ///
    /// On a two-column page, text on the same baseline but on different
    /// sides of the gutter lands in separate lines; lines are then ordered
    /// top to bottom, left column first on ties.
    pub fn lines(&self, spans: Vec<TextSpan>) -> Vec<TextLine> {
        group_into_lines(spans)
    }
}

/// Page text: one line per text line, top to bottom.
pub fn render_lines(lines: &[TextLine]) -> String {
    lines
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn group_into_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return vec![];
    }

    let columns = detect_columns(&spans);
    log::debug!("layout: {} spans, {} columns", spans.len(), columns.len());

    if columns.len() <= 1 {
        return group_single_column(spans);
    }

    let mut per_column: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let idx = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        per_column[idx].push(span);
    }

    let mut all_lines: Vec<(usize, TextLine)> = per_column
        .into_iter()
        .enumerate()
        .flat_map(|(idx, col)| group_single_column(col).into_iter().map(move |l| (idx, l)))
        .collect();

    all_lines.sort_by(|(col_a, a), (col_b, b)| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(col_a.cmp(col_b))
    });

    all_lines.into_iter().map(|(_, line)| line).collect()
}

/// Y-based grouping for a single column; PDF y grows upwards.
fn group_single_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Find a gutter: the widest run of empty vertical slices near the middle
/// of the text extent. Returns one column when there is none.
fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans.iter().map(TextSpan::right).fold(f32::NEG_INFINITY, f32::max);
    let single = || {
        vec![Column {
            left: min_x - 10.0,
            right: max_x + 10.0,
        }]
    };

    // Largest page side PDF allows, in points; the occupancy grid is sized
    // from the extent
    const MAX_EXTENT: f32 = 14_400.0;

    let extent = max_x - min_x;
    if extent < 250.0 || extent.is_nan() || extent > MAX_EXTENT {
        return single();
    }

    const SLICE: f32 = 3.0;
    let slices = (extent / SLICE) as usize + 1;
    let mut occupancy = vec![0usize; slices];
    for span in spans {
        let start = ((span.x - min_x) / SLICE) as usize;
        let end = ((span.right() - min_x) / SLICE) as usize;
        for slot in occupancy.iter_mut().take(end.min(slices - 1) + 1).skip(start) {
            *slot += 1;
        }
    }

    // Gaps in the middle 70% of the extent, scored by width, then closeness to center
    let search = (slices * 15 / 100)..(slices * 85 / 100);
    let center = slices as i64 / 2;
    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;

    let consider = |start: usize, len: usize, best: &mut Option<(usize, usize)>| {
        let width = len as f32 * SLICE;
        if width < 10.0 {
            return;
        }
        let dist = ((start + len / 2) as i64 - center).abs();
        let better = match *best {
            None => true,
            Some((b_start, b_len)) => {
                let b_width = b_len as f32 * SLICE;
                let b_dist = ((b_start + b_len / 2) as i64 - center).abs();
                width > b_width * 1.5 || (width >= b_width * 0.7 && dist < b_dist)
            }
        };
        if better {
            *best = Some((start, len));
        }
    };

    for i in search.clone() {
        match (occupancy[i] == 0, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                consider(start, i - start, &mut best);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        consider(start, search.end - start, &mut best);
    }

    let Some((gap_start, gap_len)) = best else {
        return single();
    };
    if (gap_len as f32 * SLICE) < 12.0 {
        return single();
    }

    let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * SLICE;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        log::debug!("layout: column too narrow, treating as single column");
        return single();
    }

    // Both sides need a real share of the text
    let left = spans.iter().filter(|s| s.center() < gutter).count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        return single();
    }

    log::debug!("layout: gutter at x={:.1}", gutter);
    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
        },
    ]
}

/// Text state: the text matrix plus leading.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    // Start of the current line, which Td/TD/T* move relative to
    line_e: f32,
    line_f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    /// Reset the matrix at BT; leading persists across text objects.
    fn begin(&mut self) {
        *self = Self {
            leading: self.leading,
            ..Self::default()
        };
    }

    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self.line_e = e;
        self.line_f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    /// Move the pen past text just shown.
    fn advance(&mut self, width: f32) {
        self.e += width;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Insert a word break for a large negative TJ adjustment.
fn push_word_break(text: &mut String, adjustment: f32) {
    if adjustment <= TJ_SPACE_THRESHOLD || text.is_empty() || ends_with_space(text) {
        return;
    }
    if text.chars().last().is_some_and(|c| !is_spaceless_script_char(c)) {
        text.push(' ');
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn ends_with_space(text: &str) -> bool {
    text.ends_with(' ') || text.ends_with('\u{00A0}')
}

fn starts_with_space(text: &str) -> bool {
    text.starts_with(' ') || text.starts_with('\u{00A0}')
}

/// Characters of scripts written without spaces between words.
///
/// Chinese and Japanese qualify; Korean uses word spaces and does not.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)      // CJK Unified Ideographs
        || (0x3400..=0x4DBF).contains(&code)   // Extension A
        || (0x20000..=0x2EBEF).contains(&code) // Extensions B-F
        || (0x3040..=0x309F).contains(&code)   // Hiragana
        || (0x30A0..=0x30FF).contains(&code)   // Katakana
        || (0x3000..=0x303F).contains(&code) // CJK Symbols and Punctuation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 10.0, "Helvetica".to_string())
    }

    #[test]
    fn test_span_width_estimate() {
        let s = span("abcd", 0.0, 0.0);
        assert_eq!(s.width, 20.0);
        assert_eq!(s.right(), 20.0);
    }

    #[test]
    fn test_line_text_inserts_spaces_at_gaps() {
        let line = TextLine::from_spans(vec![span("World", 60.0, 100.0), span("Hello", 10.0, 100.0)]);
        assert_eq!(line.text(), "Hello World");

        // Touching spans are one word
        let line = TextLine::from_spans(vec![span("Hel", 10.0, 100.0), span("lo", 25.0, 100.0)]);
        assert_eq!(line.text(), "Hello");
    }

    #[test]
    fn test_line_text_cjk_no_space() {
        let line = TextLine::from_spans(vec![span("日本", 10.0, 100.0), span("語", 40.0, 100.0)]);
        assert_eq!(line.text(), "日本語");
    }

    #[test]
    fn test_single_column_grouping_top_to_bottom() {
        let spans = vec![
            span("second", 10.0, 680.0),
            span("first", 10.0, 700.0),
            span("line", 50.0, 700.5),
        ];
        let lines = group_into_lines(spans);
        assert_eq!(lines.len(), 2);
        assert_eq!(render_lines(&lines), "first line\nsecond");
    }

    #[test]
    fn test_two_column_reading_order() {
        let mut spans = Vec::new();
        for i in 0..6 {
            let y = 700.0 - i as f32 * 14.0;
            spans.push(span("left column text", 50.0, y));
            spans.push(span("right column text", 350.0, y));
        }
        let columns = detect_columns(&spans);
        assert_eq!(columns.len(), 2);

        let lines = group_into_lines(spans);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0].text(), "left column text");
        assert_eq!(lines[1].text(), "right column text");
    }

    #[test]
    fn test_far_off_span_keeps_single_column() {
        let spans = vec![span("left", 72.0, 700.0), span("far", 1.0e12, 700.0)];
        assert_eq!(detect_columns(&spans).len(), 1);

        // A huge Tf size stretches the estimated width just as far
        let wide = TextSpan::new("wide".to_string(), 72.0, 680.0, 1.0e9, "Helvetica".to_string());
        let spans = vec![span("left", 72.0, 700.0), wide];
        assert_eq!(detect_columns(&spans).len(), 1);

        let nan = span("nan", f32::NAN, 660.0);
        assert_eq!(detect_columns(&[span("left", 72.0, 700.0), nan]).len(), 1);
    }

    #[test]
    fn test_column_contains_span() {
        let col = Column {
            left: 100.0,
            right: 200.0,
        };
        assert!(col.contains_span(&span("Test", 120.0, 0.0)));
        // Left edge outside, center (90 + 10) inside
        assert!(col.contains_span(&span("Test", 90.0, 0.0)));
        assert!(!col.contains_span(&span("Test", 250.0, 0.0)));
    }

    #[test]
    fn test_text_matrix_leading() {
        let mut m = TextMatrix::default();
        m.set(1.0, 0.0, 0.0, 1.0, 72.0, 700.0);
        m.leading = 14.0;
        m.advance(30.0);
        m.next_line();
        assert_eq!(m.position(), (72.0, 686.0));
    }

    #[test]
    fn test_tj_word_break() {
        let mut text = "Hello".to_string();
        push_word_break(&mut text, 250.0);
        assert_eq!(text, "Hello ");
        push_word_break(&mut text, 250.0);
        assert_eq!(text, "Hello ");

        let mut text = "Kern".to_string();
        push_word_break(&mut text, 40.0);
        assert_eq!(text, "Kern");
    }
}
