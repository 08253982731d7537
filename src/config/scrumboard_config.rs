//! Scrumboard configuration file handling
//!
//! Loads and manages the ~/.config/scrumboard/config.yaml file.

use super::provider::ProviderConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File holding the last resolved filters per user and provider
    #[serde(default = "default_filter_store")]
    pub filter_store: PathBuf,
}

fn default_filter_store() -> PathBuf {
    let mut path = config_dir();
    path.push("filters.json");
    path
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter_store: default_filter_store(),
        }
    }
}

/// Scrumboard configuration
///
/// Represents the complete ~/.config/scrumboard/config.yaml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrumboardConfig {
    /// Registered issue-tracking providers
    pub providers: Vec<ProviderConfig>,

    /// Provider used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    #[serde(default)]
    pub session: SessionConfig,
}

// Always use ~/.config for consistency across platforms (macOS, Linux)
fn config_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("scrumboard");
    path
}

impl ScrumboardConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            default_provider: None,
            session: SessionConfig::default(),
        }
    }

    /// Load configuration from the default path (~/.config/scrumboard/config.yaml)
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::ScrumboardError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading Scrumboard configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            providers = config.providers.len(),
            default_provider = ?config.default_provider,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save_default(&self) -> Result<()> {
        let path = Self::default_path();
        self.save(&path)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving Scrumboard configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/scrumboard/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = config_dir();
        path.push("config.yaml");
        path
    }

    pub fn get_provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn add_provider(&mut self, provider: ProviderConfig) {
        self.providers.push(provider);
    }

    pub fn remove_provider(&mut self, id: &str) -> Option<ProviderConfig> {
        let index = self.providers.iter().position(|p| p.id == id)?;
        Some(self.providers.remove(index))
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }

    /// Explicit choice, else the configured default, else the only provider
    pub fn select_provider<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .or(self.default_provider.as_deref())
            .or_else(|| match self.providers.as_slice() {
                [only] => Some(only.id.as_str()),
                _ => None,
            })
    }
}

impl Default for ScrumboardConfig {
    fn default() -> Self {
        Self::new()
    }
}
