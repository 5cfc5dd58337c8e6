//! Run configuration: which raw columns to drop and which study type to keep.
//!
//! Settings come from an optional YAML file and are then overridden by
//! command-line flags.

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{cli::PipelineArgs, schema};

/// Administrative columns of a registry export that downstream analysis never reads.
pub const DEFAULT_DROP_COLUMNS: &[&str] = &[
    "Rank",
    "Acronym",
    "Status",
    "Sponsor/Collaborators",
    "Locations",
    "Funded Bys",
    "Other IDs",
    "Study Documents",
    "URL",
    "First Posted",
    "Results First Posted",
    "Last Update Posted",
];
pub const DEFAULT_STUDY_TYPE: &str = "Interventional";
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrubConfig {
    pub drop_columns: Vec<String>,
    pub study_type: String,
    /// Rows between progress log lines (0 disables them).
    pub progress_interval: usize,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        ScrubConfig {
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|c| c.to_string()).collect(),
            study_type: DEFAULT_STUDY_TYPE.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ScrubConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration from {path:?}"))?;
        let config = ScrubConfig::from_yaml(&raw)
            .with_context(|| format!("Parsing configuration from {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML document; an empty document yields the defaults.
    pub fn from_yaml(input: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(input)?;
        if value.is_null() {
            return Ok(ScrubConfig::default());
        }
        Ok(serde_yaml::from_value(value)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Loads the configured file (or the defaults) and applies flag overrides.
    pub fn from_args(args: &PipelineArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => ScrubConfig::load(path)?,
            None => ScrubConfig::default(),
        };
        if args.keep_all_columns {
            config.drop_columns.clear();
        } else if let Some(columns) = &args.drop_columns {
            config.drop_columns = columns
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .collect();
        }
        if let Some(study_type) = &args.study_type {
            config.study_type = study_type.trim().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make the derivations impossible.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.study_type.trim().is_empty(),
            "study_type must not be empty"
        );
        for column in &self.drop_columns {
            ensure!(
                !schema::REQUIRED_COLUMNS.contains(&column.as_str()),
                "Column '{column}' is required by the derivations and cannot be dropped"
            );
        }
        Ok(())
    }
}
