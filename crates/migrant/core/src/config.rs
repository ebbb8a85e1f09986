// Migrant
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Engine configuration
//!
//! Settings come from defaults, an optional TOML file and environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MIGRANT_CONFIG";

/// Environment variable overriding the worker thread count
pub const WORKER_THREADS_ENV: &str = "MIGRANT_WORKER_THREADS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Settings for corpus discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusOptions {
    /// File extensions registered as file entities
    pub extensions: Vec<String>,
    /// Whether dot-prefixed files and directories are scanned
    pub include_hidden: bool,
    pub follow_links: bool,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["java".to_string(), "class".to_string(), "xml".to_string()],
            include_hidden: false,
            follow_links: false,
        }
    }
}

/// Analysis engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads per stage; `None` uses one per CPU
    pub worker_threads: Option<usize>,
    /// Clear facts, links and edges before each run
    pub reset_before_run: bool,
    pub thread_name_prefix: String,
    pub corpus: CorpusOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            reset_before_run: true,
            thread_name_prefix: "migrant-worker".to_string(),
            corpus: CorpusOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the configuration from `path`, then `MIGRANT_CONFIG`, then defaults,
    /// and applies environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            Self::load_from_file(env_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), SettingsError> {
        if let Some(value) = lookup(WORKER_THREADS_ENV) {
            let threads = value.trim().parse::<usize>().map_err(|_| SettingsError::InvalidValue {
                key: WORKER_THREADS_ENV.to_string(),
                value: value.clone(),
            })?;
            self.worker_threads = Some(threads);
        }
        Ok(())
    }
}
