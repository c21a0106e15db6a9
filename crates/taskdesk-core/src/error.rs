use std::fmt;

use thiserror::Error;

/// Failure talking to the task API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    Url(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    /// Series with attachments that still need an include/exclude decision.
    #[error("Attachment decision required for {} series: {}", .0.len(), .0.join(", "))]
    MissingDecisions(Vec<String>),

    #[error("Series '{0}' has an end date and cannot be reassigned")]
    NotForever(String),

    #[error("{failed} of {total} reassignments failed")]
    PartialBulkFailure { failed: usize, total: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A data-integrity problem found in a fetch batch. Logged, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// An instance whose series id does not resolve to the series it was delivered with.
    OrphanInstance { task_id: String, series_id: String },
    /// A series record with no usable series id.
    MissingSeries { title: String },
    /// More than one series record with the same id in one batch.
    DuplicateSeries { series_id: String },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::OrphanInstance { task_id, series_id } => write!(
                f,
                "instance {} references series {} which is not in this batch",
                task_id, series_id
            ),
            IntegrityWarning::MissingSeries { title } => {
                write!(f, "series '{}' has no series id", title)
            }
            IntegrityWarning::DuplicateSeries { series_id } => {
                write!(f, "series {} appears more than once", series_id)
            }
        }
    }
}

impl IntegrityWarning {
    pub fn log(&self) {
        tracing::warn!(warning = %self, "data integrity warning");
    }
}
