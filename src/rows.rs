//! Derived-field insertion.
//!
//! [`insert_field()`] pads a row with [`NULL_SENTINEL`] up to the header width
//! before overwriting the named column, so a row only ever grows and always
//! matches its header once a field has been written.

use crate::{error::ScrubError, schema::column_position};

/// Placeholder written for any derived value that is unavailable.
pub const NULL_SENTINEL: &str = "null";

/// Writes `value` into the column called `name` of `header`.
pub fn insert_field(
    mut row: Vec<String>,
    header: &[String],
    name: &str,
    value: &str,
) -> Result<Vec<String>, ScrubError> {
    let position = column_position(header, name)?;
    if row.len() < header.len() {
        row.resize(header.len(), NULL_SENTINEL.to_string());
    }
    row[position] = value.to_string();
    Ok(row)
}
