use crate::validation::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("min_date {min} must be on or before max_date {max}")]
    InvertedRange { min: NaiveDate, max: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteFormat {
    #[default]
    Plain,
    Html,
}

/// Which cause an entity keeps when it was both rescheduled directly and
/// shifted by a predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausePrecedence {
    #[default]
    Direct,
    Propagated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub locale: String,
    pub note_format: NoteFormat,
    pub cause_precedence: CausePrecedence,
    /// Prefix for entity links in HTML notes, e.g. `https://pm.example.com`.
    pub link_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_date: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
            max_date: NaiveDate::from_ymd_opt(2999, 12, 31).unwrap_or(NaiveDate::MAX),
            locale: "en".to_string(),
            note_format: NoteFormat::Plain,
            cause_precedence: CausePrecedence::Direct,
            link_base: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_date > self.max_date {
            return Err(ConfigError::InvertedRange {
                min: self.min_date,
                max: self.max_date,
            });
        }
        Ok(())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            min: self.min_date,
            max: self.max_date,
        }
    }
}
