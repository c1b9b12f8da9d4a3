use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::PipelineConfig;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Output locations for one session's image directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub image_dir: PathBuf,
    pub flat_csv: PathBuf,
    pub merged_csv: PathBuf,
    pub report_json: PathBuf,
    pub error_log: PathBuf,
}

impl SessionPaths {
    pub fn new(image_dir: &Path, config: &PipelineConfig) -> Self {
        Self {
            image_dir: image_dir.to_path_buf(),
            flat_csv: image_dir.join(&config.flat_csv_name),
            merged_csv: image_dir.join(&config.merged_csv_name),
            report_json: image_dir.join(&config.report_name),
            error_log: image_dir.join(&config.error_log_name),
        }
    }
}

/// Ensures the log directory exists. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
