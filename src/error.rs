//! Pipeline error taxonomy
//!
//! Validation failures abort the whole batch: there is no per-record
//! skip-and-continue. Zero-denominator ratios are *not* errors; they are
//! carried as `None` in the record type and excluded from aggregates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the ETL pipeline to its caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// One or more required input columns are absent.
    #[error("Schema error in {}: missing required columns [{}]", .path.display(), .missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    /// A value could not be interpreted (time, date, amount, count).
    #[error("Format error at line {line}, column '{column}': {message}")]
    Format {
        line: usize,
        column: String,
        message: String,
    },

    /// The input had a header but no shift rows.
    #[error("No shift records in {}", .0.display())]
    EmptyDataset(PathBuf),

    /// A stage ran before one of the stages it depends on.
    #[error("Stage '{stage}' requires stage '{requires}' to run first")]
    StageOrder {
        stage: &'static str,
        requires: &'static str,
    },

    /// A period total left the 64-bit currency range.
    #[error("Aggregate overflow: {quantity} exceeds the 64-bit currency range")]
    Overflow { quantity: &'static str },

    #[error("I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSV error ({}): {}", .0.display(), .1)]
    Csv(PathBuf, #[source] csv::Error),
}

impl PipelineError {
    /// Shorthand for a format error outside of any file context (line 0).
    pub fn format(column: &str, message: impl Into<String>) -> Self {
        Self::Format {
            line: 0,
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// Attach a 1-based file line to a format error. Other variants pass through.
    #[must_use]
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Format {
                column, message, ..
            } => Self::Format {
                line,
                column,
                message,
            },
            other => other,
        }
    }

    /// Rename the column of a format error. Other variants pass through.
    #[must_use]
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Self::Format { line, message, .. } => Self::Format {
                line,
                column: column.to_string(),
                message,
            },
            other => other,
        }
    }
}
