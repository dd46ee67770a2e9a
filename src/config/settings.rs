//! Settings loading
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `storypoint.toml` in the project root
//! 3. Environment variables (`STORYPOINT_MODEL_PATH`,
//!    `STORYPOINT_VECTORIZER_PATH`, `STORYPOINT_DATA_DIR`)
//!
//! Relative paths are resolved against the project root.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "storypoint.toml";

pub const ENV_MODEL_PATH: &str = "STORYPOINT_MODEL_PATH";
pub const ENV_VECTORIZER_PATH: &str = "STORYPOINT_VECTORIZER_PATH";
pub const ENV_DATA_DIR: &str = "STORYPOINT_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// TF-IDF vectorizer artifact
    pub vectorizer_path: PathBuf,
    /// Regressor artifact
    pub model_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vectorizer_path: PathBuf::from("ml_artifacts/vectorizer.json"),
            model_path: PathBuf::from("ml_artifacts/model.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding history.jsonl and feedback.jsonl
    pub data_dir: PathBuf,
    /// Default number of predictions shown by `history`
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// Shortest story accepted at the command line (after trimming)
    pub min_story_length: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_story_length: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub input: InputConfig,
}

impl Settings {
    /// Load settings for a project root. Never fails; a broken config file
    /// is reported and ignored.
    pub fn load(root: &Path) -> Self {
        let mut settings = Self::from_file(&root.join(CONFIG_FILE));
        settings.apply_env(|key| std::env::var(key).ok());
        settings.resolve_paths(root);
        settings
    }

    fn from_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match load_toml(path) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Override values from environment-style lookups
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_MODEL_PATH).filter(|v| !v.is_empty()) {
            self.model.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_VECTORIZER_PATH).filter(|v| !v.is_empty()) {
            self.model.vectorizer_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.store.data_dir = PathBuf::from(dir);
        }
    }

    /// Make relative paths relative to `root`
    pub fn resolve_paths(&mut self, root: &Path) {
        for path in [
            &mut self.model.vectorizer_path,
            &mut self.model.model_path,
            &mut self.store.data_dir,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }
}

fn load_toml(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

const EXAMPLE_CONFIG: &str = r#"# storypoint configuration
# Relative paths are resolved against the directory holding this file.

[model]
# Artifacts written by `storypoint train`
vectorizer_path = "ml_artifacts/vectorizer.json"
model_path = "ml_artifacts/model.json"

[store]
# Prediction history and feedback logs live here
data_dir = "data"

# Predictions shown by `storypoint history`
history_limit = 10

[input]
# Shorter stories are rejected before estimation
min_story_length = 5
"#;

/// Write an example config into `root`. Returns the path and whether the
/// file was created (an existing file is never overwritten).
pub fn init_config(root: &Path) -> Result<(PathBuf, bool)> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        return Ok((config_path, false));
    }
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;
    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok((config_path, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.model_path, PathBuf::from("ml_artifacts/model.json"));
        assert_eq!(settings.store.data_dir, PathBuf::from("data"));
        assert_eq!(settings.store.history_limit, 10);
        assert_eq!(settings.input.min_story_length, 5);
    }

    #[test]
    fn test_load_without_file_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::from_file(&dir.path().join(CONFIG_FILE));
        settings.resolve_paths(dir.path());
        assert_eq!(settings.store.data_dir, dir.path().join("data"));
        assert_eq!(
            settings.model.vectorizer_path,
            dir.path().join("ml_artifacts/vectorizer.json")
        );
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[store]
history_limit = 25
"#,
        )
        .unwrap();
        assert_eq!(settings.store.history_limit, 25);
        assert_eq!(settings.store.data_dir, PathBuf::from("data"));
        assert_eq!(settings.model, ModelConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings: Settings = toml::from_str(
            r#"
[model]
model_path = "from_file.json"
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_MODEL_PATH, "/abs/model.json"),
            (ENV_DATA_DIR, "elsewhere"),
            (ENV_VECTORIZER_PATH, ""),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));
        settings.resolve_paths(Path::new("/root/project"));

        assert_eq!(settings.model.model_path, PathBuf::from("/abs/model.json"));
        assert_eq!(settings.store.data_dir, PathBuf::from("/root/project/elsewhere"));
        // Empty values are ignored
        assert_eq!(
            settings.model.vectorizer_path,
            PathBuf::from("/root/project/ml_artifacts/vectorizer.json")
        );
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store\nhistory_limit = ").unwrap();
        assert_eq!(Settings::from_file(&path), Settings::default());
    }

    #[test]
    fn test_init_writes_parseable_example_once() {
        let dir = TempDir::new().unwrap();
        let (path, created) = init_config(dir.path()).unwrap();
        assert!(created);

        let parsed: Settings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, Settings::default());

        std::fs::write(&path, "# mine\n").unwrap();
        let (_, created) = init_config(dir.path()).unwrap();
        assert!(!created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
    }
}
