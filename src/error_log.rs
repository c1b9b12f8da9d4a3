//! Append-only error log for one session directory.
//!
//! Each line is `YYYY-MM-DD HH:MM:SS - message`. Nothing reads this file back;
//! it exists for the operator.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped entry. Write failures go to the console log
    /// only; they never interrupt the pipeline.
    pub fn record(&self, message: &str) {
        let line = format!(
            "{} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = result {
            crate::log(&format!(
                "Could not write error log {}: {}",
                self.path.display(),
                e
            ));
        }
    }
}
