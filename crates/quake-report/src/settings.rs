use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Statistical report over seismic event CSV exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "quake-report",
    about = "Statistical report over seismic event CSV exports",
    version
)]
pub struct Settings {
    /// CSV file or directory of CSV files (discovered when omitted)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Field delimiter: a single character, or `tab`
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: char,

    /// Treat the first line as data instead of a header
    #[arg(long)]
    pub no_header: bool,

    /// Rows shown in the strongest and deepest event tables
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub top: u32,

    /// Year to break down by month
    #[arg(long)]
    pub year: Option<i32>,

    /// Magnitude above which an event is listed as strong
    #[arg(long, default_value = "4.0")]
    pub strong_threshold: f64,

    /// Show empty magnitude and depth buckets
    #[arg(long)]
    pub include_empty_buckets: bool,

    /// Write every report view as JSON to this path
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Print the first N raw lines with their fields and exit
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse from the process arguments.
    pub fn load() -> Self {
        Self::parse()
    }

    /// `DEBUG` when `--debug` is given, otherwise `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

/// Accept exactly one character, or the word `tab` / the escape `\t`.
fn parse_delimiter(raw: &str) -> Result<char, String> {
    if raw.eq_ignore_ascii_case("tab") || raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some('"'), None) => Err("the quote character cannot be a delimiter".to_string()),
        (Some(c), None) => Ok(c),
        _ => Err(format!("delimiter must be a single character, got '{raw}'")),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
