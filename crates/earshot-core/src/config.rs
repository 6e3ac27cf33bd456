//! Configuration management for earshot.
//!
//! The layout mirrors the voice-assistant configuration it plugs into: a
//! process-wide `lang`, the hosted platform `server`, and an `stt` table that
//! names the selected module and carries one sub-table per module.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::APP_NAME;
use crate::language::{DEFAULT_LANGUAGE, normalize_language};

/// Module used when `stt.module` is not set.
pub const DEFAULT_MODULE: &str = "mycroft";

const DEFAULT_SERVER_URL: &str = "https://api.mycroft.ai";
const DEFAULT_SERVER_VERSION: &str = "v1";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Working language tag, e.g. `en-us`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Hosted platform API
    #[serde(default)]
    pub server: ServerConfig,

    /// Speech-to-text selection and per-module settings
    #[serde(default)]
    pub stt: SttConfig,
}

/// Settings for the platform's own hosted API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,

    #[serde(default = "default_server_version")]
    pub version: String,

    /// Bearer token for the hosted API, if the deployment requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_server_version() -> String {
    DEFAULT_SERVER_VERSION.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            version: default_server_version(),
            token: None,
        }
    }
}

/// The `stt` table: the selected module plus settings keyed by module name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttConfig {
    #[serde(default = "default_module")]
    pub module: String,

    #[serde(flatten)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            modules: BTreeMap::new(),
        }
    }
}

/// Settings for one speech-to-text module.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ModuleConfig {
    /// Endpoint for self-hosted servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Module-level API key (used by modules that keep it outside `credential`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Recognition topic hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Transport timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub credential: CredentialConfig,
}

/// Raw credential fields. Which ones matter depends on the module.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CredentialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Structured credential, e.g. a service-account document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}

impl Config {
    /// The working language, normalized, falling back to `en-US`.
    pub fn language(&self) -> String {
        normalize_language(self.lang.as_deref().unwrap_or(DEFAULT_LANGUAGE))
    }

    /// Name of the selected speech-to-text module.
    pub fn module(&self) -> &str {
        &self.stt.module
    }

    /// Settings for the named module, if present.
    pub fn module_config(&self, module: &str) -> Option<&ModuleConfig> {
        self.stt.modules.get(module)
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a ConfigManager for an explicit file.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.module() != DEFAULT_MODULE && config.module_config(config.module()).is_none() {
            warn!(
                module = config.module(),
                "Selected stt module has no settings table, requests will carry empty credentials"
            );
        }

        Ok(config)
    }

    /// Saves the configuration to the config file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
