//! Runtime configuration.
//!
//! Values come from the environment, with a `.env` file loaded first if one
//! exists. Unset variables fall back to defaults; malformed ones are errors.

use crate::error::ConfigError;
use flashset_core::{DeckOrder, StudyLimits, StudySettings};
use std::path::PathBuf;

pub const DATABASE_PATH_VAR: &str = "FLASHSET_DATABASE_PATH";
pub const MAX_NEW_CARDS_VAR: &str = "FLASHSET_MAX_NEW_CARDS";
pub const MAX_TOTAL_CARDS_VAR: &str = "FLASHSET_MAX_TOTAL_CARDS";
pub const SHUFFLE_VAR: &str = "FLASHSET_SHUFFLE";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub database_path: PathBuf,
    pub study: StudySettings,
    pub log_filter: String,
}

impl RuntimeConfig {
    /// Load from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StudyLimits::default();

        let database_path = lookup(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let max_new_cards = parse_or(&lookup, MAX_NEW_CARDS_VAR, defaults.max_new_cards)?;
        let max_total_cards = parse_or(&lookup, MAX_TOTAL_CARDS_VAR, defaults.max_total_cards)?;
        let shuffle = parse_or(&lookup, SHUFFLE_VAR, false)?;

        Ok(Self {
            database_path,
            study: StudySettings {
                limits: StudyLimits {
                    max_new_cards,
                    max_total_cards,
                },
                deck_order: if shuffle {
                    DeckOrder::shuffled()
                } else {
                    DeckOrder::Stacked
                },
            },
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Database file under the platform data directory, or the current directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashset")
        .join("flashset.db")
}
