//! Error taxonomy for the scrubbing pipeline.
//!
//! Only [`ScrubError::ColumnNotFound`] and [`ScrubError::DuplicateColumn`] are
//! fatal; they are raised while the schema is being set up. Every other
//! variant is recovered inside the pipeline, either by dropping the current
//! row ([`ScrubError::drops_row`]) or by substituting the null sentinel.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrubError {
    /// A required column is absent from the header.
    #[error("Column '{0}' not found in header")]
    ColumnNotFound(String),

    /// A column name occurs twice in the raw header, or clashes with a derived column.
    #[error("Column '{0}' appears more than once in header")]
    DuplicateColumn(String),

    /// A multi-value cell could not be decoded into key/value segments.
    #[error("Malformed multi-value cell in column '{column}': {reason}")]
    MalformedMultiValue { column: String, reason: String },

    /// A sub-field key is absent from an otherwise valid decoded cell.
    #[error("Key '{0}' not present in decoded cell")]
    MissingOptionalKey(String),

    /// A date expression has the wrong shape or an unknown month name.
    #[error("Malformed date '{value}': {reason}")]
    MalformedDate { value: String, reason: String },

    /// A row does not share the shape the column positions were computed for.
    #[error("Row has {actual} cell(s) but {expected} were expected")]
    WidthMismatch { expected: usize, actual: usize },

    /// A data row holds bytes that are not valid in the input encoding.
    #[error("Row is not valid text: {0}")]
    UndecodableRow(String),
}

impl ScrubError {
    /// Whether the pipeline drops the whole row when it meets this error.
    pub fn drops_row(&self) -> bool {
        matches!(
            self,
            ScrubError::MalformedMultiValue { .. }
                | ScrubError::WidthMismatch { .. }
                | ScrubError::UndecodableRow(_)
        )
    }

    pub(crate) fn malformed_date(value: &str, reason: impl Into<String>) -> Self {
        ScrubError::MalformedDate {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
