//! CSV discovery and line-by-line ingestion for quake-report.
//!
//! Turns delimited event exports into [`EventRecord`]s. Bad lines are counted
//! and reported as [`Diagnostic`]s; only a source that cannot be read fails
//! the call.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use quake_core::error::{QuakeError, Result};
use quake_core::formatting::percentage;
use quake_core::models::{Diagnostic, EventRecord};
use quake_core::tokenizer::split_fields;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builder::{LineOutcome, RecordBuilder};

/// Rejections beyond this many per call are logged at debug level only.
const WARN_REJECTION_LIMIT: usize = 3;

const UTF8_BOM: char = '\u{feff}';

// ── Outcome types ─────────────────────────────────────────────────────────────

/// Line counters for one ingestion call. `total_lines` counts data lines
/// only (the header is excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub total_lines: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl IngestStats {
    /// Accepted lines as a percentage of data lines, two decimals.
    pub fn success_rate(&self) -> f64 {
        percentage(self.accepted as f64, self.total_lines as f64, 2)
    }

    fn add(&mut self, other: &IngestStats) {
        self.total_lines += other.total_lines;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

/// Everything one ingestion call produced.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Accepted records in source order.
    pub records: Vec<EventRecord>,
    pub stats: IngestStats,
    /// Rejections and field fallbacks, in line order.
    pub diagnostics: Vec<Diagnostic>,
    /// First line of the (first) source, BOM removed. Never validated.
    pub header: Option<String>,
    /// Files read, in order. Empty for in-memory sources.
    pub sources: Vec<PathBuf>,
}

impl IngestOutcome {
    /// Append another outcome, keeping the first header seen.
    pub fn merge(&mut self, other: IngestOutcome) {
        self.records.extend(other.records);
        self.stats.add(&other.stats);
        self.diagnostics.extend(other.diagnostics);
        if self.header.is_none() {
            self.header = other.header;
        }
        self.sources.extend(other.sources);
    }
}

// ── Ingestor ──────────────────────────────────────────────────────────────────

/// Reads delimited event lines into records.
#[derive(Debug, Clone, Copy)]
pub struct Ingestor {
    delimiter: char,
    has_header: bool,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

impl Ingestor {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Whether the first line of every source is a header (default `true`).
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Ingest an in-memory line sequence. Line terminators must already be
    /// removed; a trailing `\r` is tolerated.
    pub fn ingest_lines<I, S>(&self, lines: I) -> IngestOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sink = LineSink::new(*self);
        for line in lines {
            sink.feed(line.as_ref());
        }
        sink.finish()
    }

    /// Ingest from any buffered reader. Invalid UTF-8 is replaced rather
    /// than rejected; an I/O error mid-stream fails the whole call.
    pub fn ingest_reader<R: BufRead>(&self, mut reader: R) -> Result<IngestOutcome> {
        let mut sink = LineSink::new(*self);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| QuakeError::SourceRead {
                    line: sink.line_number + 1,
                    source,
                })?;
            if read == 0 {
                break;
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            sink.feed(&String::from_utf8_lossy(&buf));
        }
        Ok(sink.finish())
    }

    /// Ingest a single file.
    pub fn ingest_path(&self, path: &Path) -> Result<IngestOutcome> {
        let file = std::fs::File::open(path).map_err(|source| {
            warn!("Cannot open {}: {}", path.display(), source);
            QuakeError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut outcome = self.ingest_reader(BufReader::new(file))?;
        outcome.sources.push(path.to_path_buf());

        info!(
            "Ingested {}: {} lines, {} accepted, {} rejected",
            path.display(),
            outcome.stats.total_lines,
            outcome.stats.accepted,
            outcome.stats.rejected,
        );
        Ok(outcome)
    }

    /// Ingest every `.csv` file below `dir`, in path order. Each file is
    /// expected to carry its own header.
    pub fn ingest_dir(&self, dir: &Path) -> Result<IngestOutcome> {
        let files = find_csv_files(dir);
        if files.is_empty() {
            return Err(QuakeError::NoSourceFiles(dir.to_path_buf()));
        }

        let mut merged = IngestOutcome::default();
        for file in &files {
            merged.merge(self.ingest_path(file)?);
        }

        debug!(
            "Processed {} records from {} files",
            merged.records.len(),
            files.len()
        );
        Ok(merged)
    }

    /// Ingest `path` as a directory when it is one, otherwise as a file.
    pub fn ingest(&self, path: &Path) -> Result<IngestOutcome> {
        if path.is_dir() {
            self.ingest_dir(path)
        } else {
            self.ingest_path(path)
        }
    }
}

// ── Discovery & preview ───────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// A raw source line next to its tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewLine {
    pub number: usize,
    pub raw: String,
    pub fields: Vec<String>,
}

/// The first `n` lines of `path`, each with the fields the tokenizer would
/// produce. Used to debug unfamiliar export formats.
pub fn preview_lines(path: &Path, n: usize, delimiter: char) -> Result<Vec<PreviewLine>> {
    let file = std::fs::File::open(path).map_err(|source| QuakeError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut preview = Vec::with_capacity(n);
    let mut buf = Vec::new();

    while preview.len() < n {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| QuakeError::SourceRead {
                line: preview.len() + 1,
                source,
            })?;
        if read == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        let raw = clean_line(&text, preview.is_empty()).to_string();
        let fields = split_fields(&raw, delimiter);
        preview.push(PreviewLine {
            number: preview.len() + 1,
            raw,
            fields,
        });
    }

    Ok(preview)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Per-call accumulator. Nothing reaches the caller until [`LineSink::finish`].
struct LineSink {
    ingestor: Ingestor,
    line_number: usize,
    header_pending: bool,
    warned: usize,
    outcome: IngestOutcome,
}

impl LineSink {
    fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            line_number: 0,
            header_pending: ingestor.has_header,
            warned: 0,
            outcome: IngestOutcome::default(),
        }
    }

    fn feed(&mut self, raw: &str) {
        self.line_number += 1;
        let line = clean_line(raw, self.line_number == 1);

        if self.header_pending {
            self.header_pending = false;
            self.outcome.header = Some(line.to_string());
            return;
        }

        self.outcome.stats.total_lines += 1;
        let fields = split_fields(line, self.ingestor.delimiter);

        match RecordBuilder::build(&fields, self.line_number) {
            LineOutcome::Accepted {
                record,
                diagnostics,
            } => {
                self.outcome.stats.accepted += 1;
                for d in &diagnostics {
                    debug!("{}", d);
                }
                self.outcome.diagnostics.extend(diagnostics);
                self.outcome.records.push(record);
            }
            LineOutcome::Rejected(diagnostic) => {
                self.outcome.stats.rejected += 1;
                if self.warned < WARN_REJECTION_LIMIT {
                    self.warned += 1;
                    warn!("Skipping {}: '{}'", diagnostic, preview_text(line));
                } else {
                    debug!("Skipping {}", diagnostic);
                }
                self.outcome.diagnostics.push(diagnostic);
            }
        }
    }

    fn finish(self) -> IngestOutcome {
        if self.outcome.stats.rejected > self.warned as u64 {
            warn!(
                "{} more rejected lines not shown",
                self.outcome.stats.rejected - self.warned as u64
            );
        }
        self.outcome
    }
}

/// Drop the line terminator and, on the first line, a UTF-8 BOM.
fn clean_line(raw: &str, first: bool) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if first {
        line.strip_prefix(UTF8_BOM).unwrap_or(line)
    } else {
        line
    }
}

/// First 50 characters of a line for log output.
fn preview_text(line: &str) -> String {
    quake_core::formatting::truncate_with_ellipsis(line, 53)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
