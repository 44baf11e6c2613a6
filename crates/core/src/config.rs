//! Configuration management for bucketflow

use crate::error::{Error, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory name
const CONFIG_DIR: &str = "bucketflow";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Per-call limit of the S3 listing and batch delete APIs
const MAX_KEYS_PER_CALL: usize = 1000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub endpoint: EndpointConfig,
    pub transfer: Option<TransferConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Store endpoint and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_region")]
    pub region: String,

    // Static keys; when both are absent the default AWS credential chain is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

/// Listing, removal and request tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_page_size")]
    pub list_page_size: usize,
    #[serde(default = "default_batch_size")]
    pub delete_batch_size: usize,
    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            list_page_size: default_page_size(),
            delete_batch_size: default_batch_size(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default values
fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_force_path_style() -> bool {
    true
}

fn default_page_size() -> usize {
    MAX_KEYS_PER_CALL
}

fn default_batch_size() -> usize {
    MAX_KEYS_PER_CALL
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    let config_dir = home.join(".config").join(CONFIG_DIR);

    // Create directory if it doesn't exist
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    Ok(config_dir)
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from the default location
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from `path`
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}

/// Save configuration to the default location
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

/// Save configuration to `path`
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    let content = toml::to_string_pretty(config)?;

    fs::write(path, content).map_err(|e| {
        Error::Config(format!("Failed to write config file: {}", e))
    })?;

    // Credentials live in this file: read/write for owner only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    let url = &config.endpoint.url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::InvalidConfig(format!(
            "Endpoint URL must start with http:// or https://, got {:?}",
            url
        )));
    }

    if config.endpoint.access_key_id.is_some() != config.endpoint.secret_access_key.is_some() {
        return Err(Error::Config(
            "access_key_id and secret_access_key must be set together".to_string(),
        ));
    }

    if let Some(transfer) = &config.transfer {
        if !(1..=MAX_KEYS_PER_CALL).contains(&transfer.list_page_size) {
            return Err(Error::InvalidConfig(format!(
                "list_page_size must be between 1 and {}",
                MAX_KEYS_PER_CALL
            )));
        }
        if !(1..=MAX_KEYS_PER_CALL).contains(&transfer.delete_batch_size) {
            return Err(Error::InvalidConfig(format!(
                "delete_batch_size must be between 1 and {}",
                MAX_KEYS_PER_CALL
            )));
        }
        if transfer.timeout == 0 {
            return Err(Error::InvalidConfig("timeout must be greater than 0".to_string()));
        }
    }

    if let Some(logging) = &config.logging {
        if !matches!(logging.format.as_str(), "pretty" | "compact") {
            return Err(Error::InvalidConfig(format!(
                "Unknown log format {:?} (expected pretty or compact)",
                logging.format
            )));
        }
    }

    Ok(())
}

/// Check if configuration exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}
