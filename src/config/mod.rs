//! Configuration module for storypoint
//!
//! This module handles:
//! - Project-level settings (storypoint.toml)
//! - Environment variable overrides
//! - Artifact and data directory locations

mod settings;

pub use settings::{
    init_config, InputConfig, ModelConfig, Settings, StoreConfig, CONFIG_FILE, ENV_DATA_DIR,
    ENV_MODEL_PATH, ENV_VECTORIZER_PATH,
};
