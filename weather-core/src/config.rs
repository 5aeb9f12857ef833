use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    fetch::{DEFAULT_BASE_URL, DEFAULT_URL_CAPACITY, FetcherConfig},
    parse::{DEFAULT_CAPACITY, DecodePolicy, ParserConfig},
    transport::TrustAnchor,
};

/// Where and how requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,

    /// PEM file with the root certificate to trust; the bundled
    /// OpenWeatherMap root is used when absent.
    pub trust_anchor: Option<PathBuf>,

    pub url_capacity: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            trust_anchor: None,
            url_capacity: DEFAULT_URL_CAPACITY,
        }
    }
}

/// How response bodies are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    pub policy: DecodePolicy,
    pub capacity: usize,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self { policy: DecodePolicy::default(), capacity: DEFAULT_CAPACITY }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// zip_code = 95123
///
/// [decoding]
/// policy = "strict"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,

    /// ZIP code used when none is given on the command line.
    pub zip_code: Option<u32>,

    pub endpoint: EndpointConfig,
    pub decoding: DecodingConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "zip-weather", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather configure` and enter your OpenWeatherMap API key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn zip_code(&self) -> Result<u32> {
        self.zip_code.ok_or_else(|| {
            anyhow!(
                "No ZIP code given and no default configured.\n\
                 Hint: pass one, e.g. `weather show 95123`, or run `weather configure`."
            )
        })
    }

    pub fn set_zip_code(&mut self, zip_code: u32) {
        self.zip_code = Some(zip_code);
    }

    /// The configured trust anchor, read from disk, or the bundled root.
    pub fn trust_anchor(&self) -> Result<TrustAnchor> {
        let Some(path) = &self.endpoint.trust_anchor else {
            return Ok(TrustAnchor::openweathermap());
        };

        let pem = fs::read(path)
            .with_context(|| format!("Failed to read trust anchor: {}", path.display()))?;

        TrustAnchor::from_pem(pem)
            .with_context(|| format!("Failed to load trust anchor: {}", path.display()))
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_url: self.endpoint.base_url.clone(),
            url_capacity: self.endpoint.url_capacity,
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig { capacity: self.decoding.capacity, policy: self.decoding.policy }
    }
}
