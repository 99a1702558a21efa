// src/sink.rs
//! Row sinks: idempotent append keyed by `alum_email`.
//!
//! The real review sheet lives behind an external collaborator; these
//! reference implementations honor the same contract for tests and the
//! standalone service path. `append` returns `false` (and writes nothing)
//! when a row for that email was already accepted by this sink instance.
//! Cross-run coordination stays with the collaborator.

use anyhow::Context;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::row::ResultRow;

pub trait RowSink {
    /// Append one row. `Ok(false)` means the email was already present
    /// and the row was skipped.
    fn append(&mut self, row: &ResultRow) -> anyhow::Result<bool>;
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<ResultRow>,
    seen: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }
}

impl RowSink for MemorySink {
    fn append(&mut self, row: &ResultRow) -> anyhow::Result<bool> {
        if !self.seen.insert(row.alum_email.to_ascii_lowercase()) {
            return Ok(false);
        }
        self.rows.push(row.clone());
        Ok(true)
    }
}

const CSV_HEADER: [&str; 7] = [
    "date",
    "alum_name",
    "alum_email",
    "sentiment",
    "giving_status",
    "assigned_staff",
    "summary",
];

/// Append-only CSV file. On open, seeds the seen-set from any rows already
/// in the file so re-runs stay idempotent within the same file.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    seen: HashSet<String>,
    needs_header: bool,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut seen = HashSet::new();
        let mut needs_header = true;

        if path.exists() {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("open csv sink at {}", path.display()))?;
            needs_header = false;
            for record in reader.records() {
                let record = record?;
                if let Some(email) = record.get(2) {
                    seen.insert(email.to_ascii_lowercase());
                }
            }
        }

        Ok(Self { path, seen, needs_header })
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl RowSink for CsvSink {
    fn append(&mut self, row: &ResultRow) -> anyhow::Result<bool> {
        if self.seen.contains(&row.alum_email.to_ascii_lowercase()) {
            return Ok(false);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("append to csv sink at {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if self.needs_header {
            writer.write_record(CSV_HEADER)?;
            self.needs_header = false;
        }
        let sentiment = row.sentiment.to_string();
        let giving_status = row.giving_status.to_string();
        writer.write_record([
            row.date.as_str(),
            row.alum_name.as_str(),
            row.alum_email.as_str(),
            sentiment.as_str(),
            giving_status.as_str(),
            row.assigned_staff.as_str(),
            row.summary.as_str(),
        ])?;
        writer.flush()?;

        self.seen.insert(row.alum_email.to_ascii_lowercase());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{GivingStatus, Sentiment};

    fn row(email: &str) -> ResultRow {
        ResultRow {
            date: "2026-01-14".into(),
            alum_name: "Ada Alum".into(),
            alum_email: email.into(),
            sentiment: Sentiment::Negative,
            giving_status: GivingStatus::PausedGiving,
            assigned_staff: String::new(),
            summary: "Please cancel my monthly donation.".into(),
        }
    }

    fn tmp_csv(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("{name}_{nanos}.csv"));
        dir
    }

    #[test]
    fn memory_sink_dedupes_by_email() {
        let mut sink = MemorySink::new();
        assert!(sink.append(&row("a@example.edu")).unwrap());
        assert!(!sink.append(&row("A@Example.edu")).unwrap(), "case-insensitive identity");
        assert!(sink.append(&row("b@example.edu")).unwrap());
        assert_eq!(sink.rows().len(), 2);
    }

    #[test]
    fn csv_sink_writes_header_then_rows() {
        let path = tmp_csv("sink_header");
        {
            let mut sink = CsvSink::open(&path).unwrap();
            assert!(sink.append(&row("a@example.edu")).unwrap());
            assert!(sink.append(&row("b@example.edu")).unwrap());
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("date,alum_name,alum_email"));
        assert_eq!(lines.count(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn csv_sink_reopen_stays_idempotent() {
        let path = tmp_csv("sink_reopen");
        {
            let mut sink = CsvSink::open(&path).unwrap();
            assert!(sink.append(&row("a@example.edu")).unwrap());
        }
        {
            let mut sink = CsvSink::open(&path).unwrap();
            assert!(!sink.append(&row("a@example.edu")).unwrap(), "seeded from existing file");
            assert!(sink.append(&row("c@example.edu")).unwrap());
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3, "header + two distinct rows");
        let _ = std::fs::remove_file(&path);
    }
}
