// File: src/config.rs
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine option ids on the wire.
pub const VARNAM_CONFIG_USE_DEAD_CONSONANTS: i32 = 100;
pub const VARNAM_CONFIG_IGNORE_DUPLICATE_TOKEN: i32 = 101;
pub const VARNAM_CONFIG_ENABLE_SUGGESTIONS: i32 = 102;

/// A single engine setting together with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOption {
    UseDeadConsonants(bool),
    /// When set, a duplicate token is accepted silently instead of rejected.
    IgnoreDuplicateToken(bool),
    /// Path of the store the engine keeps learned words in.
    EnableSuggestions(PathBuf),
}

impl EngineOption {
    pub fn id(&self) -> i32 {
        match self {
            EngineOption::UseDeadConsonants(_) => VARNAM_CONFIG_USE_DEAD_CONSONANTS,
            EngineOption::IgnoreDuplicateToken(_) => VARNAM_CONFIG_IGNORE_DUPLICATE_TOKEN,
            EngineOption::EnableSuggestions(_) => VARNAM_CONFIG_ENABLE_SUGGESTIONS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineOption::UseDeadConsonants(_) => "USE_DEAD_CONSONANTS",
            EngineOption::IgnoreDuplicateToken(_) => "IGNORE_DUPLICATE_TOKEN",
            EngineOption::EnableSuggestions(_) => "ENABLE_SUGGESTIONS",
        }
    }
}

/// Settings for one compilation run, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub use_dead_consonants: bool,
    pub ignore_duplicate_tokens: bool,
    pub suggestions_store: Option<PathBuf>,
    /// Append engine commands to this file.
    pub log_file: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Options applied to a freshly initialized engine, in this order.
    pub fn engine_options(&self) -> Vec<EngineOption> {
        let mut options = vec![
            EngineOption::UseDeadConsonants(self.use_dead_consonants),
            EngineOption::IgnoreDuplicateToken(self.ignore_duplicate_tokens),
        ];
        if let Some(store) = &self.suggestions_store {
            options.push(EngineOption::EnableSuggestions(store.clone()));
        }
        options
    }
}
