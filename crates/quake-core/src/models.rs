use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

use crate::data_processors::RegionNormalizer;
use crate::error::{QuakeError, Result};

// ── EventRecord ───────────────────────────────────────────────────────────────

/// One normalized seismic event read from a CSV line.
///
/// Fields are private: a record is immutable once built, and [`EventRecord::new`]
/// is the only way in, so the identity/depth invariants always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    id: String,
    /// Depth in metres; finite and `>= 0`.
    depth: f64,
    magnitude_type: String,
    magnitude: f64,
    /// Raw region label as it appeared in the source (quotes removed).
    region: String,
    time: Option<NaiveDateTime>,
}

impl EventRecord {
    /// Build a record, rejecting an empty id, a negative or non-finite depth,
    /// and a non-finite magnitude.
    pub fn new(
        id: impl Into<String>,
        depth: f64,
        magnitude_type: impl Into<String>,
        magnitude: f64,
        region: impl Into<String>,
        time: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(QuakeError::InvalidRecord("empty id".to_string()));
        }
        if !depth.is_finite() || depth < 0.0 {
            return Err(QuakeError::InvalidRecord(format!(
                "depth must be finite and non-negative, got {depth}"
            )));
        }
        if !magnitude.is_finite() {
            return Err(QuakeError::InvalidRecord(format!(
                "magnitude must be finite, got {magnitude}"
            )));
        }
        Ok(Self {
            id,
            depth,
            magnitude_type: magnitude_type.into(),
            magnitude,
            region: region.into(),
            time,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn magnitude_type(&self) -> &str {
        &self.magnitude_type
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn time(&self) -> Option<NaiveDateTime> {
        self.time
    }

    /// Calendar year of the timestamp, if there is one.
    pub fn year(&self) -> Option<i32> {
        self.time.map(|t| t.year())
    }

    /// Region label reduced to its first component, title-cased and
    /// truncated. Empty when the record carries no region.
    pub fn normalized_region(&self) -> String {
        RegionNormalizer::normalize(&self.region)
    }

    /// `true` when depth is usable for depth statistics (strictly positive).
    pub fn has_depth(&self) -> bool {
        self.depth > 0.0
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let time = self
            .time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        write!(
            f,
            "Event{{id='{}', magnitude={:.2}, region='{}', time={}}}",
            self.id, self.magnitude, self.region, time
        )
    }
}

// ── Distribution ──────────────────────────────────────────────────────────────

/// A single labelled count inside a [`Distribution`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionEntry {
    pub label: String,
    pub count: u64,
}

/// Ordered label → count mapping.
///
/// Order is significant: it is whatever the producing view defines (bucket
/// edge order, ascending key, or descending count) and is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Distribution {
    entries: Vec<DistributionEntry>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label. The caller is responsible for label uniqueness.
    pub fn push(&mut self, label: impl Into<String>, count: u64) {
        self.entries.push(DistributionEntry {
            label: label.into(),
            count,
        });
    }

    /// Count for `label`, if present.
    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistributionEntry> {
        self.entries.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, count as f64)` pairs, the shape chart renderers take.
    pub fn to_chart_rows(&self) -> Vec<(String, f64)> {
        self.entries
            .iter()
            .map(|e| (e.label.clone(), e.count as f64))
            .collect()
    }
}

impl FromIterator<(String, u64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut dist = Distribution::new();
        for (label, count) in iter {
            dist.push(label, count);
        }
        dist
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Category of a non-fatal data-quality event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Line had fewer fields than a record needs; the line was dropped.
    TooFewFields,
    /// A numeric field could not be parsed and defaulted to 0.0.
    NumericFallback,
    /// A non-blank time field matched no supported pattern.
    TimestampUnrecognized,
    /// A negative depth was clamped to 0.0.
    NegativeDepth,
    /// The id field was blank and a token was generated.
    GeneratedId,
    /// Both magnitude and depth are zero, which usually means missing data.
    ZeroMagnitudeAndDepth,
    /// Coerced values still failed record validation; the line was dropped.
    InvalidRecord,
}

/// A recorded data-quality event tied to a 1-based source line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(line: usize, kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            detail: detail.into(),
        }
    }

    /// `true` when the line was dropped rather than degraded.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::TooFewFields | DiagnosticKind::InvalidRecord
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {:?}: {}", self.line, self.kind, self.detail)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
