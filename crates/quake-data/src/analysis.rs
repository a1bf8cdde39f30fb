//! Main analysis pipeline for quake-report.
//!
//! Loads a CSV file or directory, aggregates it and returns an
//! [`AnalysisResult`] ready for printing or export.

use std::path::Path;

use chrono::Utc;
use quake_core::error::Result;
use quake_core::models::{Diagnostic, Distribution, EventRecord};
use serde::Serialize;
use tracing::info;

use crate::aggregator::{EventAggregator, GroupStats, SummaryStats};
use crate::reader::{IngestStats, Ingestor};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// The file or directory that was analysed.
    pub source: String,
    pub files_read: usize,
    /// Wall-clock seconds spent reading and parsing.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent computing the summary.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_source`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub aggregator: EventAggregator,
    pub summary: SummaryStats,
    pub stats: IngestStats,
    pub diagnostics: Vec<Diagnostic>,
    pub header: Option<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Diagnostics for lines that were dropped.
    pub fn rejections(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_rejection())
    }

    /// Diagnostics for accepted lines where a field fell back to a default.
    pub fn fallbacks(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_rejection())
    }
}

/// Knobs for the views included in a [`ReportSnapshot`].
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub top_n: usize,
    pub strong_threshold: f64,
    pub year: Option<i32>,
    pub include_empty_buckets: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            strong_threshold: 4.0,
            year: None,
            include_empty_buckets: false,
        }
    }
}

/// Serializable copy of every report view.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub metadata: AnalysisMetadata,
    pub ingest: IngestStats,
    pub success_rate: f64,
    pub summary: SummaryStats,
    pub regions: Distribution,
    pub magnitudes: Distribution,
    pub depths: Distribution,
    pub years: Distribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<Distribution>,
    pub strongest: Vec<EventRecord>,
    pub deepest: Vec<EventRecord>,
    pub strong_events: Vec<EventRecord>,
    pub magnitude_types: Vec<GroupStats>,
    pub yearly: Vec<GroupStats>,
}

impl ReportSnapshot {
    pub fn build(result: &AnalysisResult, options: &ReportOptions) -> Self {
        let agg = &result.aggregator;

        Self {
            metadata: result.metadata.clone(),
            ingest: result.stats,
            success_rate: result.stats.success_rate(),
            summary: result.summary.clone(),
            regions: agg.region_distribution(),
            magnitudes: agg.magnitude_distribution(options.include_empty_buckets),
            depths: agg.depth_distribution(options.include_empty_buckets),
            years: agg.year_distribution(),
            months: options.year.map(|y| agg.month_distribution(y)),
            strongest: owned(agg.top_by_magnitude(options.top_n)),
            deepest: owned(agg.top_by_depth(options.top_n)),
            strong_events: owned(agg.strong_events(options.strong_threshold)),
            magnitude_types: agg.magnitude_type_statistics(),
            yearly: agg.yearly_statistics(),
        }
    }
}

fn owned(records: Vec<&EventRecord>) -> Vec<EventRecord> {
    records.into_iter().cloned().collect()
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Ingest `path` (a file, or every `.csv` below a directory).
/// 2. Load the accepted records into an [`EventAggregator`].
/// 3. Compute the summary and timing metadata.
pub fn analyze_source(path: &Path, ingestor: Ingestor) -> Result<AnalysisResult> {
    // ── Step 1: Load records ──────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let outcome = ingestor.ingest(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let files_read = outcome.sources.len();
    let header = outcome.header.clone();
    let diagnostics = outcome.diagnostics.clone();

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let aggregate_start = std::time::Instant::now();
    let mut aggregator = EventAggregator::new();
    let stats = aggregator.absorb(outcome);
    let summary = aggregator.summary();
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    info!(
        "Analysed {} records from {} file(s) in {:.3}s",
        aggregator.len(),
        files_read,
        load_time + aggregate_time
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        source: path.display().to_string(),
        files_read,
        load_time_seconds: load_time,
        aggregate_time_seconds: aggregate_time,
    };

    Ok(AnalysisResult {
        aggregator,
        summary,
        stats,
        diagnostics,
        header,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
