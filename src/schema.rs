//! Header resolution, column projection, and schema widening.
//!
//! Column positions are resolved once against the raw header and carried in a
//! [`Projection`], which refuses to touch rows of any other width. This keeps
//! positional removal safe even when a row holds duplicate cell values.

use std::collections::HashSet;

use crate::error::ScrubError;

/// Sub-fields split out of the "Study Designs" cell, in output order.
pub const DESIGN_FIELDS: [&str; 4] = [
    "Allocation",
    "Intervention Model",
    "Masking",
    "Primary Purpose",
];
pub const INTERVENTION_METHODS: &str = "Intervention Methods";
pub const DURATION: &str = "Duration (yr)";

pub const STUDY_TYPE: &str = "Study Type";
pub const STUDY_DESIGNS: &str = "Study Designs";
pub const INTERVENTIONS: &str = "Interventions";
pub const START_DATE: &str = "Start Date";
pub const COMPLETION_DATE: &str = "Completion Date";

/// Raw columns the derivations read from.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    STUDY_TYPE,
    STUDY_DESIGNS,
    INTERVENTIONS,
    START_DATE,
    COMPLETION_DATE,
];

/// Names appended to the projected header, in the order they are appended.
pub fn derived_columns() -> impl Iterator<Item = &'static str> {
    DESIGN_FIELDS
        .into_iter()
        .chain([INTERVENTION_METHODS, DURATION])
}

pub fn column_position(header: &[String], name: &str) -> Result<usize, ScrubError> {
    header
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| ScrubError::ColumnNotFound(name.to_string()))
}

/// Resolves each requested name to its position, preserving request order.
pub fn column_positions<S: AsRef<str>>(
    header: &[String],
    columns: &[S],
) -> Result<Vec<usize>, ScrubError> {
    columns
        .iter()
        .map(|name| column_position(header, name.as_ref()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    source_width: usize,
    drop: HashSet<usize>,
}

impl Projection {
    /// Builds a projection removing `columns` from rows shaped like `header`.
    pub fn resolve<S: AsRef<str>>(header: &[String], columns: &[S]) -> Result<Self, ScrubError> {
        let positions = column_positions(header, columns)?;
        Ok(Projection {
            source_width: header.len(),
            drop: positions.into_iter().collect(),
        })
    }

    pub fn dropped(&self) -> usize {
        self.drop.len()
    }

    /// Returns a copy of `row` without the dropped positions.
    pub fn apply(&self, row: &[String]) -> Result<Vec<String>, ScrubError> {
        if row.len() != self.source_width {
            return Err(ScrubError::WidthMismatch {
                expected: self.source_width,
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.drop.contains(idx))
            .map(|(_, cell)| cell.clone())
            .collect())
    }
}

/// Rejects a header that names any column twice.
pub fn ensure_unique(header: &[String]) -> Result<(), ScrubError> {
    let mut seen = HashSet::new();
    match header.iter().find(|name| !seen.insert(name.as_str())) {
        Some(name) => Err(ScrubError::DuplicateColumn(name.clone())),
        None => Ok(()),
    }
}

/// Appends the derived column names to an already projected header.
pub fn widen_header(projected: Vec<String>) -> Result<Vec<String>, ScrubError> {
    let mut widened = projected;
    for name in derived_columns() {
        if widened.iter().any(|existing| existing == name) {
            return Err(ScrubError::DuplicateColumn(name.to_string()));
        }
        widened.push(name.to_string());
    }
    Ok(widened)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn column_positions_follow_request_order() {
        let header = strings(&["Rank", "Title", "URL", "Study Type"]);
        assert_eq!(
            column_positions(&header, &["URL", "Rank"]).unwrap(),
            vec![2, 0]
        );
    }

    #[test]
    fn column_positions_report_missing_name() {
        let header = strings(&["Rank", "Title"]);
        assert_eq!(
            column_positions(&header, &["Title", "Status"]),
            Err(ScrubError::ColumnNotFound("Status".into()))
        );
    }

    #[test]
    fn projection_removes_positions_even_with_duplicate_values() {
        let header = strings(&["Rank", "Acronym", "Title", "Status"]);
        let projection = Projection::resolve(&header, &["Acronym", "Status"]).unwrap();
        let row = strings(&["x", "x", "x", "y"]);
        assert_eq!(projection.apply(&row).unwrap(), strings(&["x", "x"]));
        assert_eq!(projection.dropped(), 2);
    }

    #[test]
    fn projection_rejects_already_projected_rows() {
        let header = strings(&["Rank", "Title", "URL"]);
        let projection = Projection::resolve(&header, &["Rank"]).unwrap();
        let once = projection.apply(&strings(&["1", "Trial", "http://x"])).unwrap();
        assert_eq!(once, strings(&["Trial", "http://x"]));
        assert_eq!(
            projection.apply(&once),
            Err(ScrubError::WidthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn widen_header_appends_derived_columns_in_order() {
        let widened = widen_header(strings(&["Study Type"])).unwrap();
        assert_eq!(
            widened,
            strings(&[
                "Study Type",
                "Allocation",
                "Intervention Model",
                "Masking",
                "Primary Purpose",
                "Intervention Methods",
                "Duration (yr)",
            ])
        );
    }

    #[test]
    fn repeated_raw_column_names_are_rejected() {
        assert_eq!(ensure_unique(&strings(&["Rank", "Title", "URL"])), Ok(()));
        assert_eq!(
            ensure_unique(&strings(&["Rank", "Title", "Rank"])),
            Err(ScrubError::DuplicateColumn("Rank".into()))
        );
    }

    #[test]
    fn widen_header_refuses_name_clash() {
        assert_eq!(
            widen_header(strings(&["Masking"])),
            Err(ScrubError::DuplicateColumn("Masking".into()))
        );
    }
}
