//! Pipeline configuration.
//!
//! Loads settings from config.json at startup. Provides the vision service
//! endpoint, timeouts and retry policy, the reshape depth, and output file names.
//! The config is built once in `main` and handed to each stage by reference.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base directory that `--image-dir` is resolved against
    pub data_dir: PathBuf,
    /// Chat-completions endpoint of the vision service
    pub api_url: String,
    /// Model name sent with each request
    pub model: String,
    /// Reply length cap sent with each request
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Total attempts per image for transport failures (1 = no retry)
    pub max_attempts: u32,
    /// Pause between attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// How many values per label are kept in the wide table
    pub rank_depth: usize,
    /// Trim and upper-case symbols on both sides of the reference join
    pub normalize_symbols: bool,
    /// Flat table file name, written into the image directory
    pub flat_csv_name: String,
    /// Wide table file name, written into the image directory
    pub merged_csv_name: String,
    /// Batch report file name, written into the image directory
    pub report_name: String,
    /// Error log file name, appended in the image directory
    pub error_log_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 60,
            max_attempts: 2,
            retry_delay_ms: 2000,
            rank_depth: 5,
            normalize_symbols: false,
            flat_csv_name: "extracted_levels.csv".to_string(),
            merged_csv_name: "merged_levels.csv".to_string(),
            report_name: "extraction_report.json".to_string(),
            error_log_name: "extraction_error_log.txt".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration.
    ///
    /// With an explicit path, the file must exist and parse. Without one,
    /// config.json next to the executable is tried and any problem with it
    /// falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::load_default_location(),
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::missing_input(path));
        }
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        crate::log(&format!("Config loaded from {}", path.display()));
        Ok(config)
    }

    fn load_default_location() -> Self {
        let config_path = crate::paths::get_exe_dir().join("config.json");

        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if !config_path.exists() {
            crate::log("config.json not found. Using default config.");
            return Self::default();
        }

        match Self::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                crate::log(&format!("{}. Using defaults.", e));
                Self::default()
            }
        }
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rank_depth == 0 {
            return Err(PipelineError::config("rank_depth must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(PipelineError::config("max_attempts must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::config("model must not be empty"));
        }
        Ok(())
    }

    /// Resolves the image directory argument against `data_dir`.
    /// An absolute argument is used as-is.
    pub fn image_dir(&self, arg: &str) -> PathBuf {
        self.data_dir.join(arg)
    }
}
