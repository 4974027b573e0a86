//! Stream-mode table detection.
//!
//! Tables are found from text alignment alone: spans are grouped into rows by
//! baseline, left edges that line up across rows become column boundaries, and
//! runs of rows that agree with those boundaries form a table. No ruling lines
//! are consulted.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::layout::TextSpan;
use crate::model::TableRows;

/// Width of the buckets left edges are snapped to, in points.
const EDGE_BUCKET: f32 = 5.0;

/// How far a span's left edge may sit from a column boundary and still count
/// as aligned, in points.
const ALIGN_TOLERANCE: f32 = 5.0;

/// A table region found on a page.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub top_y: f32,
    pub bottom_y: f32,
    pub right_x: f32,
    /// Column left boundaries, ascending.
    pub columns: Vec<f32>,
    pub rows: Vec<RowSpans>,
}

/// The spans of one table row.
#[derive(Debug, Clone)]
pub struct RowSpans {
    pub y: f32,
    pub spans: Vec<TextSpan>,
}

#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    pub min_rows: usize,
    pub min_columns: usize,
    /// More columns than this is word-level splitting, not a table.
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of the font size.
    pub y_tolerance_factor: f32,
    /// Share of rows (or of a row's spans) that must align with a boundary.
    pub min_alignment_ratio: f32,
    /// Minimum distance between two column boundaries, in points.
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Find the tables among a page's spans.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        let cfg = &self.config;
        if spans.len() < cfg.min_rows * cfg.min_columns {
            return vec![];
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < cfg.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!("tables: {} rows, column edges {:?}", rows.len(), columns);
        if columns.len() < cfg.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_regions(&rows, &columns) {
            let region = &rows[start..=end];

            // Boundaries re-detected within the region itself
            let columns = self.detect_columns(region);
            if columns.len() < cfg.min_columns {
                continue;
            }
            if columns.len() > cfg.max_columns {
                log::debug!("tables: skipping region with {} columns", columns.len());
                continue;
            }
            if is_list_pattern(region, &columns) {
                log::debug!("tables: skipping region that reads as a list");
                continue;
            }

            let right_x = region
                .iter()
                .flat_map(|r| r.spans.iter())
                .map(TextSpan::right)
                .fold(f32::NEG_INFINITY, f32::max);

            tables.push(DetectedTable {
                top_y: region[0].y,
                bottom_y: region[region.len() - 1].y,
                right_x,
                columns,
                rows: region.to_vec(),
            });
        }

        tables
    }

    /// Detect tables and return each as a row x cell string matrix.
    pub fn extract_rows(&self, spans: &[TextSpan]) -> Vec<TableRows> {
        self.detect(spans).iter().map(to_rows).collect()
    }

    /// Group spans into rows, top to bottom, each sorted left to right.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<RowSpans> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        rows.push(finish_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            rows.push(finish_row(current));
        }

        rows
    }

    /// Column boundaries: left edges recurring across rows.
    ///
    /// Counts each edge bucket once per row, using only rows with two or more
    /// spans when there are enough of them.
    fn detect_columns(&self, rows: &[RowSpans]) -> Vec<f32> {
        let multi: Vec<&RowSpans> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let (basis, per_row): (Vec<&RowSpans>, bool) = if multi.len() >= self.config.min_rows {
            (multi, true)
        } else {
            (rows.iter().collect(), false)
        };

        let mut counts: HashMap<i32, usize> = HashMap::new();
        for row in &basis {
            let buckets = row.spans.iter().map(|s| (s.x / EDGE_BUCKET).round() as i32);
            if per_row {
                for bucket in buckets.collect::<HashSet<_>>() {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            } else {
                for bucket in buckets {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_hits = ((basis.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut edges: Vec<f32> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_hits)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::with_capacity(edges.len());
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Runs of at least `min_rows` consecutive aligned rows, as inclusive
    /// index ranges.
    fn find_regions(&self, rows: &[RowSpans], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }
}

/// Render a detected table as rows of cell strings.
///
/// Each span goes to exactly one column; several spans in one cell are
/// joined with a space. Every row has one cell per column.
pub fn to_rows(table: &DetectedTable) -> TableRows {
    table
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); table.columns.len()];
            for span in &row.spans {
                let idx = column_for(span.x, &table.columns, table.right_x);
                if let Some(cell) = cells.get_mut(idx) {
                    cell.push(span.text.trim());
                }
            }
            cells.into_iter().map(|parts| parts.join(" ")).collect()
        })
        .collect()
}

fn finish_row(spans: Vec<TextSpan>) -> RowSpans {
    let y = spans.iter().map(|s| s.y).sum::<f32>() / spans.len() as f32;
    RowSpans { y, spans }
}

fn alignment_score(row: &RowSpans, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|s| columns.iter().any(|c| (s.x - c).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Column index for a left edge, with 10pt of slack before each boundary;
/// falls back to the nearest boundary.
fn column_for(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Whether an apparent table is really a bulleted or numbered list whose
/// markers were drawn as separate spans.
fn is_list_pattern(rows: &[RowSpans], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        let first = row
            .spans
            .iter()
            .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        if let Some(span) = first {
            let text = span.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }

    let total = rows.len() as f32;
    if bullets as f32 / total >= 0.5 {
        return true;
    }
    // Numbered first columns occur in real tables; only reject the 2-column case
    columns.len() == 2 && (bullets + numbers) as f32 / total >= 0.5
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// "1.", "12)", "3", "a.", "B)"
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    let mut chars = cleaned.chars();
    let Some(last) = chars.next_back() else {
        return false;
    };
    if last != '.' && last != ')' {
        return false;
    }
    let body: Vec<char> = chars.collect();
    match body.as_slice() {
        [c] if c.is_alphabetic() => true,
        digits => !digits.is_empty() && digits.iter().all(char::is_ascii_digit),
    }
}
