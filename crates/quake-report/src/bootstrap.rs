use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default CSV file name looked up during discovery.
pub const DEFAULT_FILE_NAME: &str = "earthquakes.csv";

// ── Directory bootstrap ────────────────────────────────────────────────────────

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.quake-report/`.
pub fn app_dir() -> PathBuf {
    app_dir_in(&home_dir())
}

fn app_dir_in(home: &Path) -> PathBuf {
    home.join(".quake-report")
}

/// Ensure `~/.quake-report/` exists.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    ensure_directories_in(&home_dir())
}

/// Create the application directory below `home` and return it.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let app = app_dir_in(home);
    std::fs::create_dir_all(&app)?;
    Ok(app)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an `EnvFilter` directive. Unknown names fall back
/// to `info`.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or appends to `log_file` when one is given.
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
    }

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Locate the input CSV when `--input` is not given.
///
/// Checks, in order:
/// 1. `./earthquakes.csv`
/// 2. `~/.quake-report/earthquakes.csv`
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_path_in(&cwd, &home_dir())
}

pub fn discover_data_path_in(cwd: &Path, home: &Path) -> Option<PathBuf> {
    let candidates = [
        cwd.join(DEFAULT_FILE_NAME),
        app_dir_in(home).join(DEFAULT_FILE_NAME),
    ];
    candidates.into_iter().find(|p| p.is_file())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
