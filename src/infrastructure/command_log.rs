use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE: &str = "commands.log";

/// Appends one JSON object per line to `logs/commands.log`.
#[derive(Debug)]
pub struct CommandLog {
    path: Option<PathBuf>,
    guard: Mutex<()>,
}

impl CommandLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: Some(logs_dir.join(LOG_FILE)),
            guard: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, command: &str, message: &str) {
        self.append("info", command, message);
    }

    pub fn warn(&self, command: &str, message: &str) {
        self.append("warn", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}
