//! Settings and configuration utilities.
//!
//! Settings are read from $HOME/.push-scope/settings.json. Environment
//! variables take precedence over the file, and the file's `env` table is a
//! fallback for variables that are not set.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::git::changes::DEFAULT_SIMILARITY_THRESHOLD;
use crate::git::{ClassifyOptions, WhitespacePolicy};

/// Overrides `similarity_detection_threshold`.
pub const SIMILARITY_VAR: &str = "PUSH_SCOPE_SIMILARITY";
/// Overrides `ignore_whitespace`; `all`, `change` or `none`.
pub const WHITESPACE_VAR: &str = "PUSH_SCOPE_IGNORE_WHITESPACE";
/// Overrides `unique_to_branch`; `true` or `false`.
pub const UNIQUE_TO_BRANCH_VAR: &str = "PUSH_SCOPE_UNIQUE_TO_BRANCH";

/// Settings loaded from $HOME/.push-scope/settings.json.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Fraction of content that must match for a rename (0.0 to 1.0).
    #[serde(default = "default_similarity")]
    pub similarity_detection_threshold: f64,

    /// Whitespace differences to ignore when diffing.
    #[serde(default)]
    pub ignore_whitespace: Option<WhitespacePolicy>,

    /// Only report commits not reachable from any other branch.
    #[serde(default)]
    pub unique_to_branch: bool,

    /// Environment variable fallbacks.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_similarity() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            similarity_detection_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            ignore_whitespace: None,
            unique_to_branch: false,
            env: HashMap::new(),
        }
    }
}

impl Settings {
    /// Loads settings from the default location and applies environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::load_from_path(&settings_path)?.with_env_overrides()
    }

    /// Loads settings from a specific path without environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str::<Settings>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn get_settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home_dir.join(".push-scope").join("settings.json"))
    }

    /// Returns an environment variable with fallback to settings.
    pub fn get_env_var(&self, key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) => Some(value),
            Err(_) => self.env.get(key).cloned(),
        }
    }

    /// Applies `PUSH_SCOPE_*` overrides.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = self.get_env_var(SIMILARITY_VAR) {
            self.similarity_detection_threshold = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {SIMILARITY_VAR}: {value}"))?;
        }

        if let Some(value) = self.get_env_var(WHITESPACE_VAR) {
            self.ignore_whitespace = match value.trim() {
                "" | "none" => None,
                other => Some(
                    other
                        .parse()
                        .with_context(|| format!("Invalid {WHITESPACE_VAR}: {value}"))?,
                ),
            };
        }

        if let Some(value) = self.get_env_var(UNIQUE_TO_BRANCH_VAR) {
            self.unique_to_branch = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {UNIQUE_TO_BRANCH_VAR}: {value}"))?;
        }

        Ok(self)
    }

    /// Returns the diff options these settings describe.
    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            similarity_threshold: self.similarity_detection_threshold,
            whitespace: self.ignore_whitespace,
        }
    }
}
