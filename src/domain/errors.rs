//! Pipeline error taxonomy
//!
//! Per-item errors (a page that never loaded, an inference call that failed)
//! are skipped and accumulated in the run summary. Configuration and storage
//! errors are fatal for the run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Timed out after {waited_ms}ms waiting for {url}")]
    FetchTimeout { url: String, waited_ms: u64 },

    #[error("Element '{element}' not found on {url}")]
    ElementMissing { url: String, element: String },

    #[error("Fetching {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Product title '{title}' on {url} has no '|' separated code")]
    MalformedTitle { url: String, title: String },

    #[error("Inference failed for question '{question}': {reason}")]
    InferenceFailure { question: String, reason: String },

    #[error("Image download from {url} failed: {reason}")]
    ImageDownload { url: String, reason: String },

    #[error("Storage operation '{operation}' failed: {reason}")]
    Storage { operation: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    Configuration { field: String, message: String },

    #[error("No new products found")]
    EmptyBatch,
}

impl PipelineError {
    pub fn fetch_timeout(url: &str, waited: std::time::Duration) -> Self {
        Self::FetchTimeout {
            url: url.to_string(),
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn element_missing(url: &str, element: &str) -> Self {
        Self::ElementMissing {
            url: url.to_string(),
            element: element.to_string(),
        }
    }

    pub fn fetch_failed(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn inference_failure(question: &str, reason: impl std::fmt::Display) -> Self {
        Self::InferenceFailure {
            question: question.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn image_download(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::ImageDownload {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn storage(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(field: &str, message: impl std::fmt::Display) -> Self {
        Self::Configuration {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the failure is local to one page or product, so the run can
    /// skip the item and continue.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::FetchTimeout { .. } => true,
            Self::ElementMissing { .. } => true,
            Self::FetchFailed { .. } => true,
            Self::MalformedTitle { .. } => true,
            Self::InferenceFailure { .. } => true,
            Self::ImageDownload { .. } => true,
            Self::EmptyBatch => true,
            Self::Storage { .. } => false,
            Self::Configuration { .. } => false,
        }
    }

    /// Short, stable label used when failures are grouped in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::ElementMissing { .. } => "element_missing",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::MalformedTitle { .. } => "malformed_title",
            Self::InferenceFailure { .. } => "inference_failure",
            Self::ImageDownload { .. } => "image_download",
            Self::Storage { .. } => "storage",
            Self::Configuration { .. } => "configuration",
            Self::EmptyBatch => "empty_batch",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_per_item_errors_are_recoverable() {
        assert!(PipelineError::fetch_timeout("https://shop.test/p/1", Duration::from_secs(30)).is_recoverable());
        assert!(PipelineError::inference_failure("describe the shirt color", "model offline").is_recoverable());
        assert!(PipelineError::element_missing("https://shop.test", "#toolbar-amount").is_recoverable());
    }

    #[test]
    fn test_run_level_errors_are_fatal() {
        assert!(!PipelineError::storage("upsert_batch", "disk full").is_recoverable());
        assert!(!PipelineError::configuration("table_name", "empty").is_recoverable());
    }

    #[test]
    fn test_timeout_message_reports_wait() {
        let err = PipelineError::fetch_timeout("https://shop.test", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Timed out after 1500ms waiting for https://shop.test");
        assert_eq!(err.kind(), "fetch_timeout");
    }
}
