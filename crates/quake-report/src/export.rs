use std::path::Path;

use quake_core::error::Result;
use serde::Serialize;

/// Write `value` as pretty JSON to `path`, creating parent directories.
///
/// The document goes to a sibling temp file first and is renamed into place,
/// so readers never see a half-written report.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Doc {
        count: u32,
        label: &'static str,
    }

    #[test]
    fn test_write_json_atomic_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reports").join("2023").join("report.json");
        write_json_atomic(&path, &Doc { count: 3, label: "x" }).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["count"], 3);
        assert_eq!(value["label"], "x");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_json_atomic_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        write_json_atomic(&path, &Doc { count: 1, label: "a" }).unwrap();
        write_json_atomic(&path, &Doc { count: 2, label: "b" }).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["count"], 2);
    }
}
