//! Accuracy of stored extraction records against ground-truth text.
//!
//! Each `*.json` record in a directory is matched to `<stem>.txt` in a
//! ground-truth directory, where `<stem>` is the record's `file_name` without
//! its extension. Both texts are normalized and compared by edit distance.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Average accuracy a run needs to pass.
pub const PASS_THRESHOLD: f64 = 0.95;

/// Lowercase and collapse every whitespace run to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1 - distance / len(truth)` over characters.
///
/// Not clamped: an extraction much longer than the truth scores below zero.
pub fn similarity(extracted: &str, truth: &str) -> f64 {
    let distance = strsim::levenshtein(extracted, truth);
    let len = truth.chars().count().max(1);
    1.0 - distance as f64 / len as f64
}

/// Text of a stored record, rebuilt from its pages or blocks.
///
/// A page's `content` is either a string or an object with `text`. DOCX
/// records contribute their non-empty block texts. Records with neither fall
/// back to the top-level `text`.
pub fn record_text(record: &Value) -> String {
    if let Some(pages) = record.get("pages").and_then(Value::as_array) {
        return pages
            .iter()
            .map(|page| {
                let content = page.get("content").unwrap_or(page);
                match content {
                    Value::String(s) => s.as_str(),
                    other => other.get("text").and_then(Value::as_str).unwrap_or(""),
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let Some(blocks) = record.get("blocks").and_then(Value::as_array) {
        return blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    record
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Accuracy for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileScore {
    pub file_name: String,
    pub accuracy: f64,
}

/// Outcome of comparing a record directory against ground truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Records with a ground-truth file, in record file name order
    pub scores: Vec<FileScore>,
    /// Documents with no ground-truth file
    pub missing: Vec<String>,
}

impl EvaluationReport {
    /// Mean accuracy, `None` when nothing matched.
    pub fn average(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: f64 = self.scores.iter().map(|s| s.accuracy).sum();
        Some(sum / self.scores.len() as f64)
    }

    pub fn passed(&self, threshold: f64) -> bool {
        self.average().is_some_and(|avg| avg >= threshold)
    }
}

/// Score every record in `records_dir` that has ground truth in `truth_dir`.
///
/// Records that cannot be read or parsed are skipped with a warning.
pub fn evaluate_dir(records_dir: &Path, truth_dir: &Path) -> Result<EvaluationReport> {
    if !truth_dir.is_dir() {
        return Err(Error::Other(format!(
            "ground truth directory not found: {}",
            truth_dir.display()
        )));
    }

    let mut records: Vec<PathBuf> = fs::read_dir(records_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    records.sort();

    let mut report = EvaluationReport::default();
    for path in records {
        let record: Value = match fs::read_to_string(&path)
            .map_err(Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(|e| Error::Other(e.to_string())))
        {
            Ok(record) => record,
            Err(e) => {
                log::warn!("{}: skipped: {}", path.display(), e);
                continue;
            }
        };

        let file_name = match record.get("file_name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                log::warn!("{}: skipped: no file_name", path.display());
                continue;
            }
        };
        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        let truth_path = truth_dir.join(format!("{}.txt", stem));
        let truth = match fs::read_to_string(&truth_path) {
            Ok(truth) => truth,
            Err(_) => {
                log::debug!("{}: no ground truth at {}", file_name, truth_path.display());
                report.missing.push(file_name);
                continue;
            }
        };

        let accuracy = similarity(&normalize(&record_text(&record)), &normalize(&truth));
        log::debug!("{}: accuracy {:.4}", file_name, accuracy);
        report.scores.push(FileScore {
            file_name,
            accuracy,
        });
    }

    Ok(report)
}
