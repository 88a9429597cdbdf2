use std::{
    env,
    path::{Path, PathBuf},
};

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use sift_types::NamingConvention;
use tracing::warn;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "SIFT_CONFIG_PATH";

/// Default depth limit for nested field selections.
pub const DEFAULT_MAX_SELECTION_DEPTH: usize = 16;

/// Process configuration for the RPC core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiftConfig {
    /// Manifest files merged into the schema registry.
    #[serde(default)]
    pub manifests: Vec<PathBuf>,
    /// Naming convention for client-facing identifiers.
    #[serde(default)]
    pub output_naming: NamingConvention,
    /// Selections nested deeper than this are rejected.
    #[serde(default = "default_max_selection_depth")]
    pub max_selection_depth: usize,
    /// Backend error codes that mean "no such record".
    #[serde(default = "default_not_found_codes")]
    pub not_found_codes: Vec<String>,
}

fn default_max_selection_depth() -> usize {
    DEFAULT_MAX_SELECTION_DEPTH
}

fn default_not_found_codes() -> Vec<String> {
    vec!["not_found".into(), "record_not_found".into()]
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            manifests: Vec::new(),
            output_naming: NamingConvention::default(),
            max_selection_depth: DEFAULT_MAX_SELECTION_DEPTH,
            not_found_codes: default_not_found_codes(),
        }
    }
}

impl SiftConfig {
    /// Loads the configuration from [`default_config_path`].
    ///
    /// A missing or unreadable file yields the defaults; a file that exists
    /// but does not parse is logged and also falls back to defaults.
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Loads the configuration from `path`, with the same fallbacks as [`SiftConfig::load`].
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return SiftConfig::default();
        };
        match serde_json::from_str::<SiftConfig>(&content) {
            Ok(mut config) => {
                config.manifests = config.manifests.iter().map(|manifest| expand_tilde(&manifest.to_string_lossy())).collect();
                config
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "ignoring unparsable config file");
                SiftConfig::default()
            }
        }
    }
}

/// Get the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("sift").join("config.json")
}

fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}
