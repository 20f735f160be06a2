use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{anyhow, Result};

use crate::relay;

pub const DEFAULT_PORT: u16 = 8787;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    /// Where the TUI finds the relay server.
    pub server_url: Option<String>,
    /// Port `socratic serve` listens on.
    pub port: Option<u16>,
    /// Model identifier sent to the provider.
    pub model: Option<String>,
    /// Provider endpoint override.
    pub provider_base_url: Option<String>,
    /// Provider API key; the NVIDIA_API_KEY env var takes precedence.
    pub api_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Write a default config file if none exists yet, so there is
    /// something on disk to edit.
    pub fn scaffold() -> Result<()> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            return Ok(());
        }
        Self::default().save()
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.port()))
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| relay::DEFAULT_MODEL.to_string())
    }

    pub fn provider_base_url(&self) -> String {
        self.provider_base_url
            .clone()
            .unwrap_or_else(|| relay::DEFAULT_BASE_URL.to_string())
    }

    /// Env var first, config file second.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(relay::API_KEY_ENV).ok().or_else(|| self.api_key.clone())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("socratic").join("config.json"))
    }
}
