//! Error types for the level extraction pipeline.

use std::path::Path;
use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the extraction and reshape pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required file or directory does not exist.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// The image is not a supported raster format (JPEG or PNG).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Network, auth or quota failure talking to the vision service.
    #[error("Service call failed: {0}")]
    ServiceCallFailure(String),

    /// The service reply did not parse as a list of [label, value] pairs.
    #[error("Malformed service response: {reason} (raw: {raw:?})")]
    MalformedServiceResponse { reason: String, raw: String },

    /// Reference CSV is unreadable, empty, or lacks the symbol column.
    #[error("Reference data error: {0}")]
    ReferenceDataError(String),

    /// A table file exists but lacks a required column.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn missing_input(path: &Path) -> Self {
        PipelineError::MissingInput(path.display().to_string())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        PipelineError::UnsupportedFormat(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        PipelineError::ServiceCallFailure(msg.into())
    }

    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        PipelineError::MalformedServiceResponse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn reference(msg: impl Into<String>) -> Self {
        PipelineError::ReferenceDataError(msg.into())
    }

    pub fn invalid_table(msg: impl Into<String>) -> Self {
        PipelineError::InvalidTable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    /// Short stable name of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingInput(_) => "MissingInput",
            PipelineError::UnsupportedFormat(_) => "UnsupportedFormat",
            PipelineError::ServiceCallFailure(_) => "ServiceCallFailure",
            PipelineError::MalformedServiceResponse { .. } => "MalformedServiceResponse",
            PipelineError::ReferenceDataError(_) => "ReferenceDataError",
            PipelineError::InvalidTable(_) => "InvalidTable",
            PipelineError::Config(_) => "Config",
            PipelineError::Io(_) => "Io",
            PipelineError::Csv(_) => "Csv",
            PipelineError::Json(_) => "Json",
        }
    }

    /// Errors that only affect a single image and must not abort a batch.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingInput(_)
                | PipelineError::UnsupportedFormat(_)
                | PipelineError::ServiceCallFailure(_)
                | PipelineError::MalformedServiceResponse { .. }
        )
    }

    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::ServiceCallFailure(_))
    }
}
