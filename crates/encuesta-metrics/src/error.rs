//! Custom error types for the survey metrics core.
//!
//! This module provides the error hierarchy using `thiserror`. Everything
//! here is a caller error or an environment failure; "no data" conditions
//! (missing target column, empty filtered view) are NOT errors and are
//! modelled as result variants in [`crate::percentages::PercentageBreakdown`].

use thiserror::Error;

/// The main error type for survey metric computations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A required column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A grouping key is missing or the key list is unusable.
    ///
    /// This is a precondition violation on the caller's side: the external
    /// validation layer is expected to catch missing group columns before
    /// invoking the core.
    #[error("Invalid group key: {0}")]
    InvalidGroupKey(String),

    /// A statistic was requested over a non-numeric column.
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MetricsError>,
    },
}

impl MetricsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MetricsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for the presentation layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidGroupKey(_) => "INVALID_GROUP_KEY",
            Self::NotNumeric(_) => "NOT_NUMERIC",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a caller precondition violation.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::ColumnNotFound(_)
                | Self::InvalidGroupKey(_)
                | Self::NotNumeric(_)
                | Self::InvalidConfig(_)
        )
    }
}

/// Result type alias for metric computations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MetricsError::Polars(e).with_context(context))
    }
}
