// File: src/logging.rs
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends one line per engine command to a file. Write failures are ignored.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn from_config(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::to_file(path),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn record(&self, message: impl AsRef<str>) {
        if let Some(path) = &self.path {
            if let Ok(mut file) = File::options().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", message.as_ref());
            }
        }
    }
}
