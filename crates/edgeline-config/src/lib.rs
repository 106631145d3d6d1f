//! Tolerant TOML-backed configuration. A missing file is not an error;
//! every field has a documented default, so a config value is always
//! fully populated regardless of which keys a user's file supplies.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

fn default_history_capacity() -> u32 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_line_bytes() -> usize {
    8192
}

fn default_tab_width() -> u8 {
    8
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: u32,
    #[serde(default = "default_true")]
    pub ignore_duplicates: bool,
    #[serde(default = "default_true")]
    pub ignore_space: bool,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            ignore_duplicates: true,
            ignore_space: true,
            max_line_bytes: default_max_line_bytes(),
            case_sensitive: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EditingConfig {
    #[serde(default = "default_tab_width")]
    pub tab_width: u8,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self { tab_width: default_tab_width() }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { case_sensitive: true }
    }
}

/// Top-level, fully-defaulted configuration. The core crate never parses
/// this itself — it receives an already-loaded `Config` value.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub editing: EditingConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "edgeline::config", path = %path.display(), "config file absent, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read(e)),
        };
        let config: Config = toml::from_str(&text).map_err(ConfigError::Parse)?;
        tracing::info!(target: "edgeline::config", path = %path.display(), "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = Config::default();
        assert_eq!(c.history.capacity, 10_000);
        assert!(c.history.ignore_duplicates);
        assert!(c.history.ignore_space);
        assert_eq!(c.history.max_line_bytes, 8192);
        assert_eq!(c.editing.tab_width, 8);
        assert!(c.completion.case_sensitive);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let c = Config::load(Path::new("/nonexistent/edgeline-config-test.toml")).unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edgeline.toml");
        fs::write(&path, "[history]\ncapacity = 500\n").unwrap();
        let c = Config::load(&path).unwrap();
        assert_eq!(c.history.capacity, 500);
        assert!(c.history.ignore_duplicates);
        assert_eq!(c.editing.tab_width, 8);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edgeline.toml");
        fs::write(&path, "this is not valid toml =").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
