use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::DEFAULT_MIN_CONFIDENCE;

const ENV_PREFIX: &str = "SCRIPTSEEK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptseekConfig {
    /// Base URL of the search API, e.g. "http://localhost:8000"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Confidence floor sent with script searches
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_min_confidence() -> f32 {
    DEFAULT_MIN_CONFIDENCE
}

impl Default for ScriptseekConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// `<config_dir>/scriptseek`, home of the config and session files.
pub fn root_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join("scriptseek"))
}

impl ScriptseekConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(root_path()?.join("config.toml"))
    }

    /// Load config from the default path, overlaid with `SCRIPTSEEK_*`
    /// environment variables. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        settings
            .try_deserialize::<Self>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Writes a default config file when none exists. Returns the path.
    pub fn ensure_default_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }
}
