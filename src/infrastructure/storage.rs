use crate::domain::models::Report;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::report_codec::decode_reports;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads every `*.json` feed in `input_dir`, in file-name order.
pub fn read_input_reports(input_dir: &Path) -> Result<Vec<Report>, InfraError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut reports = Vec::new();
    for path in paths {
        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            continue;
        }
        reports.extend(decode_reports(&raw)?);
    }
    Ok(reports)
}

pub trait PageStore: Send + Sync {
    fn write(&self, relative_path: &Path, contents: &str) -> Result<PathBuf, InfraError>;
}

#[derive(Debug, Clone)]
pub struct FilesystemPageStore {
    root: PathBuf,
}

impl FilesystemPageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PageStore for FilesystemPageStore {
    fn write(&self, relative_path: &Path, contents: &str) -> Result<PathBuf, InfraError> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "questdrop-storage-tests-{}-{}",
            std::process::id(),
            sequence
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    #[test]
    fn input_reports_are_read_from_json_files_only() {
        let dir = temp_dir();
        fs::write(
            dir.join("b.json"),
            r#"[{"id": "r2", "report_id": "r2", "runcount": 2, "timestamp": "2024-01-02T00:00:00Z"}]"#,
        )
        .expect("write b");
        fs::write(
            dir.join("a.json"),
            r#"[{"id": "r1", "report_id": "r1", "runcount": 1, "timestamp": "2024-01-01T00:00:00Z"}]"#,
        )
        .expect("write a");
        fs::write(dir.join("empty.json"), "").expect("write empty");
        fs::write(dir.join("notes.txt"), "not a feed").expect("write txt");

        let reports = read_input_reports(&dir).expect("read input");
        let ids: Vec<_> = reports.iter().map(|report| report.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn page_store_creates_parent_directories() {
        let dir = temp_dir();
        let store = FilesystemPageStore::new(&dir);
        let written = store
            .write(Path::new("date/2024-01-01.html"), "<html></html>")
            .expect("write page");
        assert_eq!(written, dir.join("date").join("2024-01-01.html"));
        assert_eq!(fs::read_to_string(written).expect("read page"), "<html></html>");

        let _ = fs::remove_dir_all(&dir);
    }
}
