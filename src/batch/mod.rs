//! Concurrent extraction of many files.
//!
//! Files run on a fixed-size rayon pool. Each worker reports when it picks a
//! file up and when it is done; the collector on the calling thread enforces
//! a per-file deadline counted from pickup. A file that misses its deadline
//! gets a synthesized timeout record. Its worker is not interrupted: it keeps
//! its pool thread until the extraction returns, and that late result is
//! dropped.

mod sink;

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, RecvTimeoutError};
use serde::Serialize;

pub use sink::{JsonDirSink, NullSink, RecordSink};

use crate::detect::DocumentKind;
use crate::error::{Error, Result};
use crate::instrument::Measurement;
use crate::model::{ExtractionError, ExtractionOutcome, Stage};
use crate::registry::ExtractorRegistry;

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Worker threads
    pub max_workers: usize,
    /// Deadline per file, counted from when a worker starts it
    pub timeout_per_file: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            timeout_per_file: Duration::from_secs(60),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_per_file = timeout;
        self
    }
}

/// One file to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub path: PathBuf,
    /// Grouping label, usually the parent folder name
    pub category: Option<String>,
    pub kind: DocumentKind,
}

impl BatchInput {
    /// An input without a category. Fails for extensions no extractor handles.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let kind = DocumentKind::from_path(&path)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Ok(Self {
            path,
            category: None,
            kind,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// The output record for one input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: ExtractionOutcome,
}

impl BatchRecord {
    pub fn new(input: &BatchInput, outcome: ExtractionOutcome) -> Self {
        Self {
            file_name: input.file_name(),
            category: input.category.clone(),
            source: input.path.clone(),
            outcome,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome
            .error()
            .is_some_and(|e| e.stage == Stage::BATCH_TIMEOUT)
    }

    /// `<category>_<stem>.json`, or `<stem>.json` without a category.
    pub fn output_name(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name.clone());
        match &self.category {
            Some(category) => format!("{}_{}.json", category, stem),
            None => format!("{}.json", stem),
        }
    }
}

/// Counts over a finished batch. Timeouts count as failures too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl BatchSummary {
    pub fn from_records(records: &[BatchRecord]) -> Self {
        let succeeded = records.iter().filter(|r| r.outcome.is_ok()).count();
        Self {
            total: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            timed_out: records.iter().filter(|r| r.is_timeout()).count(),
        }
    }
}

/// Everything a batch produced, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<BatchRecord>,
    pub summary: BatchSummary,
}

enum Message {
    Started { index: usize, at: Instant },
    Finished { index: usize, outcome: ExtractionOutcome },
}

enum Slot {
    Queued,
    /// `None` when the timeout is too large to place on the clock.
    Running { deadline: Option<Instant> },
    Done,
}

/// Runs extractions for many files with bounded concurrency.
pub struct BatchRunner {
    registry: Arc<ExtractorRegistry>,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(registry: ExtractorRegistry, config: BatchConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Extract every input and return exactly one record per input.
    ///
    /// Records reach `sink` in completion order; the report lists them in
    /// submission order. Only failing to start the worker pool is an error.
    pub fn run(&self, inputs: Vec<BatchInput>, sink: &mut dyn RecordSink) -> Result<BatchReport> {
        let started_at = Utc::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers.max(1))
            .thread_name(|i| format!("docex-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to start worker pool: {}", e)))?;

        log::info!(
            "batch: {} files, {} workers, {:?} per file",
            inputs.len(),
            self.config.max_workers,
            self.config.timeout_per_file
        );

        let (tx, rx) = unbounded();
        for (index, input) in inputs.iter().enumerate() {
            let tx = tx.clone();
            let registry = Arc::clone(&self.registry);
            let input = input.clone();
            pool.spawn(move || {
                let _ = tx.send(Message::Started {
                    index,
                    at: Instant::now(),
                });
                let outcome = run_one(&registry, &input);
                // The collector may have moved on after a timeout
                let _ = tx.send(Message::Finished { index, outcome });
            });
        }
        drop(tx);

        let mut slots: Vec<Slot> = inputs.iter().map(|_| Slot::Queued).collect();
        let mut records: Vec<Option<BatchRecord>> = inputs.iter().map(|_| None).collect();
        let mut remaining = inputs.len();
        let mut emit = |index: usize, outcome: ExtractionOutcome, records: &mut Vec<Option<BatchRecord>>| {
            let record = BatchRecord::new(&inputs[index], outcome);
            if let Err(e) = sink.accept(&record) {
                log::warn!("{}: failed to store record: {}", record.file_name, e);
            }
            records[index] = Some(record);
        };

        while remaining > 0 {
            let next_deadline = slots
                .iter()
                .filter_map(|s| match s {
                    Slot::Running { deadline } => *deadline,
                    _ => None,
                })
                .min();

            let received = match next_deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Message::Started { index, at }) => {
                    if matches!(slots[index], Slot::Queued) {
                        slots[index] = Slot::Running {
                            deadline: at.checked_add(self.config.timeout_per_file),
                        };
                    }
                }
                Ok(Message::Finished { index, outcome }) => {
                    if matches!(slots[index], Slot::Done) {
                        log::debug!("{}: discarding result after timeout", inputs[index].file_name());
                        continue;
                    }
                    slots[index] = Slot::Done;
                    remaining -= 1;
                    emit(index, outcome, &mut records);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    for index in 0..slots.len() {
                        let expired = matches!(slots[index], Slot::Running { deadline: Some(deadline) } if deadline <= now);
                        if !expired {
                            continue;
                        }
                        log::warn!("{}: timeout exceeded", inputs[index].file_name());
                        slots[index] = Slot::Done;
                        remaining -= 1;
                        let outcome = ExtractionOutcome::timed_out(
                            inputs[index].kind,
                            self.config.timeout_per_file,
                        );
                        emit(index, outcome, &mut records);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Every worker has exited; anything still open never reported back
                    for index in 0..slots.len() {
                        if matches!(slots[index], Slot::Done) {
                            continue;
                        }
                        slots[index] = Slot::Done;
                        remaining -= 1;
                        let error = ExtractionError::new(
                            "worker exited without a result",
                            Stage::BATCH_WORKER_EXCEPTION,
                        );
                        let outcome = ExtractionOutcome::failed(
                            inputs[index].kind,
                            error,
                            Measurement::default(),
                        );
                        emit(index, outcome, &mut records);
                    }
                }
            }
        }

        let records: Vec<BatchRecord> = records.into_iter().flatten().collect();
        let summary = BatchSummary::from_records(&records);
        log::info!(
            "batch: {} ok, {} failed ({} timed out)",
            summary.succeeded,
            summary.failed,
            summary.timed_out
        );

        Ok(BatchReport {
            started_at,
            finished_at: Utc::now(),
            records,
            summary,
        })
    }
}

/// Extract one input, turning a panic into a failure record.
fn run_one(registry: &ExtractorRegistry, input: &BatchInput) -> ExtractionOutcome {
    let started = Instant::now();
    match catch_unwind(AssertUnwindSafe(|| registry.extract(&input.path))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => ExtractionOutcome::failed(
            input.kind,
            ExtractionError::from_error(&e, Stage::BATCH_WORKER_EXCEPTION),
            Measurement::elapsed_only(started.elapsed()),
        ),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            log::warn!("{}: worker panicked: {}", input.path.display(), message);
            ExtractionOutcome::failed(
                input.kind,
                ExtractionError::new(message, Stage::BATCH_WORKER_EXCEPTION),
                Measurement::elapsed_only(started.elapsed()),
            )
        }
    }
}

/// Find the PDF and DOCX files in `dir` and in its immediate subdirectories,
/// sorted by path.
///
/// Files in a subdirectory get the subdirectory's name as category; files
/// directly in `dir` get none.
pub fn collect_inputs(dir: &Path) -> Result<Vec<BatchInput>> {
    let mut inputs = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let category = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for sub in fs::read_dir(&path)? {
                let file = sub?.path();
                if file.is_file() {
                    if let Ok(input) = BatchInput::new(&file) {
                        inputs.push(input.with_category(category.clone()));
                    }
                }
            }
        } else if let Ok(input) = BatchInput::new(&path) {
            inputs.push(input);
        }
    }

    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_rejects_unknown_extension() {
        assert!(BatchInput::new("notes.txt").is_err());
        assert_eq!(BatchInput::new("a/B.DOCX").unwrap().kind, DocumentKind::Docx);
    }

    #[test]
    fn test_output_name() {
        let input = BatchInput::new("in/finance/report.v2.pdf").unwrap();
        let outcome = ExtractionOutcome::timed_out(DocumentKind::Pdf, Duration::from_secs(1));

        let record = BatchRecord::new(&input, outcome.clone());
        assert_eq!(record.output_name(), "report.v2.json");

        let record = BatchRecord::new(&input.with_category("finance"), outcome);
        assert_eq!(record.output_name(), "finance_report.v2.json");
        assert!(record.is_timeout());
    }

    #[test]
    fn test_record_json_is_flat() {
        let input = BatchInput::new("cv.docx").unwrap().with_category("hr");
        let record = BatchRecord::new(
            &input,
            ExtractionOutcome::timed_out(DocumentKind::Docx, Duration::from_secs(2)),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["file_name"], "cv.docx");
        assert_eq!(json["category"], "hr");
        assert_eq!(json["error"]["stage"], "batch_timeout");
        assert!(json["blocks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_collect_inputs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("legal")).unwrap();
        for name in ["b.pdf", "a.docx", "skip.txt", "legal/c.PDF", "legal/d.md"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir_all(dir.path().join("legal/nested")).unwrap();
        fs::write(dir.path().join("legal/nested/deep.pdf"), b"").unwrap();

        let inputs = collect_inputs(dir.path()).unwrap();
        let names: Vec<(String, Option<String>)> = inputs
            .iter()
            .map(|i| (i.file_name(), i.category.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.docx".to_string(), None),
                ("b.pdf".to_string(), None),
                ("c.PDF".to_string(), Some("legal".to_string())),
            ]
        );
    }
}
