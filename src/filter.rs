use crate::{error::ScrubError, schema};

/// Keeps only rows whose study type matches a single category.
#[derive(Debug, Clone)]
pub struct StudyTypeFilter {
    position: usize,
    expected: String,
}

impl StudyTypeFilter {
    pub fn new(header: &[String], expected: &str) -> Result<Self, ScrubError> {
        Ok(StudyTypeFilter {
            position: schema::column_position(header, schema::STUDY_TYPE)?,
            expected: expected.trim().to_string(),
        })
    }

    pub fn retains(&self, row: &[String]) -> bool {
        row.get(self.position)
            .is_some_and(|value| value.trim() == self.expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        vec!["Title".to_string(), "Study Type".to_string()]
    }

    fn row(study_type: &str) -> Vec<String> {
        vec!["Trial".to_string(), study_type.to_string()]
    }

    #[test]
    fn retains_matching_study_type_after_trimming() {
        let filter = StudyTypeFilter::new(&header(), "Interventional").unwrap();
        assert!(filter.retains(&row("Interventional")));
        assert!(filter.retains(&row("  Interventional ")));
    }

    #[test]
    fn rejects_other_study_types() {
        let filter = StudyTypeFilter::new(&header(), "Interventional").unwrap();
        assert!(!filter.retains(&row("Observational")));
        assert!(!filter.retains(&row("interventional")));
        assert!(!filter.retains(&row("")));
    }

    #[test]
    fn requires_study_type_column() {
        let header = vec!["Title".to_string()];
        assert!(matches!(
            StudyTypeFilter::new(&header, "Interventional"),
            Err(ScrubError::ColumnNotFound(name)) if name == "Study Type"
        ));
    }
}
