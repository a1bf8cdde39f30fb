//! Turns the tokenized fields of one CSV line into an [`EventRecord`].
//!
//! Column layout is positional: `id, depth, magnitude_type, magnitude,
//! region, time`. Extra trailing columns are ignored.

use quake_core::data_processors::{NumberCoercer, TimestampProcessor};
use quake_core::models::{Diagnostic, DiagnosticKind, EventRecord};
use tracing::debug;
use uuid::Uuid;

/// Minimum number of fields a data line must have.
pub const MIN_FIELDS: usize = 6;

const ID: usize = 0;
const DEPTH: usize = 1;
const MAGNITUDE_TYPE: usize = 2;
const MAGNITUDE: usize = 3;
const REGION: usize = 4;
const TIME: usize = 5;

/// Result of building one line.
#[derive(Debug, Clone)]
pub enum LineOutcome {
    /// The line produced a record; `diagnostics` lists any fields that fell
    /// back to defaults.
    Accepted {
        record: EventRecord,
        diagnostics: Vec<Diagnostic>,
    },
    /// The line was dropped.
    Rejected(Diagnostic),
}

/// Stateless record assembly from positional fields.
pub struct RecordBuilder;

impl RecordBuilder {
    /// Build a record from `fields`, the tokenized content of source line
    /// `line` (1-based).
    ///
    /// Only a structurally short line is rejected; every per-field problem
    /// degrades that field to its default and is reported as a diagnostic.
    pub fn build(fields: &[String], line: usize) -> LineOutcome {
        if fields.len() < MIN_FIELDS {
            return LineOutcome::Rejected(Diagnostic::new(
                line,
                DiagnosticKind::TooFewFields,
                format!(
                    "found {} fields, expected at least {}",
                    fields.len(),
                    MIN_FIELDS
                ),
            ));
        }

        let mut diagnostics = Vec::new();

        let mut id = fields[ID].trim().to_string();
        if id.is_empty() {
            id = generate_id();
            diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::GeneratedId,
                format!("blank id replaced with {id}"),
            ));
        }

        let mut depth = coerce_number(&fields[DEPTH], "depth", line, &mut diagnostics);
        if depth < 0.0 {
            diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::NegativeDepth,
                format!("depth {depth} clamped to 0"),
            ));
            depth = 0.0;
        }

        let magnitude_type = fields[MAGNITUDE_TYPE].trim().to_string();
        let magnitude = coerce_number(&fields[MAGNITUDE], "magnitude", line, &mut diagnostics);
        let region = fields[REGION].trim().replace('"', "");

        let raw_time = fields[TIME].trim();
        let time = TimestampProcessor::parse(raw_time);
        if time.is_none() && !raw_time.is_empty() {
            diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::TimestampUnrecognized,
                format!("unrecognised time '{raw_time}'"),
            ));
        }

        if magnitude == 0.0 && depth == 0.0 {
            diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::ZeroMagnitudeAndDepth,
                format!("zero magnitude and depth for id {id}"),
            ));
        }

        match EventRecord::new(id, depth, magnitude_type, magnitude, region, time) {
            Ok(record) => LineOutcome::Accepted {
                record,
                diagnostics,
            },
            Err(e) => LineOutcome::Rejected(Diagnostic::new(
                line,
                DiagnosticKind::InvalidRecord,
                e.to_string(),
            )),
        }
    }
}

/// `UNKNOWN-` plus the first 8 hex digits of a random UUID.
fn generate_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("UNKNOWN-{}", &token[..8])
}

fn coerce_number(
    raw: &str,
    field: &str,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> f64 {
    match NumberCoercer::parse(raw) {
        Some(v) => v,
        None => {
            debug!(line, field, raw, "numeric field fell back to 0.0");
            diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::NumericFallback,
                format!("{field} '{}' is not a number", raw.trim()),
            ));
            0.0
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
