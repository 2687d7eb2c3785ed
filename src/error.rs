use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the task store, the mutator and the import/export codecs.
#[derive(Debug, Error)]
pub enum TaskflowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Start date {start} is after due date {due}")]
    InvalidDateRange { start: NaiveDate, due: NaiveDate },

    #[error("A start date requires a due date")]
    MissingDueDate,

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task id '{0}' is ambiguous, use more characters")]
    AmbiguousId(String),

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Import failed: {0}")]
    Import(String),
}

pub type Result<T> = std::result::Result<T, TaskflowError>;
