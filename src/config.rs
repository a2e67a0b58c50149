use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted UI preferences. Theme is stored as "dark" or "light"; absence
/// defaults to light.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub theme: Option<String>,
    pub api_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dark_mode(&self) -> bool {
        self.theme.as_deref() == Some("dark")
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    /// Written on every theme toggle, read once at startup.
    pub fn save_theme(dark_mode: bool) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.theme = Some(if dark_mode { "dark" } else { "light" }.to_string());
        config.save()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragmate").join("config.json"))
    }
}
