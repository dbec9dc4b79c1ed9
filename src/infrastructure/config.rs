use crate::infrastructure::error::InfraError;
use crate::infrastructure::events_client::DEFAULT_API_BASE_URL;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const CONFIG_JSON: &str = "tracktime.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_API_BASE_URL: &str = "TRACKTIME_API_BASE_URL";
const ENV_REQUEST_TIMEOUT_SECONDS: &str = "TRACKTIME_REQUEST_TIMEOUT_SECONDS";
const ENV_LOG_LEVEL: &str = "TRACKTIME_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        let url = Url::parse(&self.api_base_url).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "apiBaseUrl '{}' is not a valid URL: {error}",
                self.api_base_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(InfraError::InvalidConfig(format!(
                "apiBaseUrl must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "requestTimeoutSeconds must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_file() -> serde_json::Value {
    let defaults = AppConfig::default();
    serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "apiBaseUrl": defaults.api_base_url,
        "requestTimeoutSeconds": defaults.request_timeout_seconds,
        "logLevel": defaults.log_level
    })
}

pub fn ensure_default_config(config_dir: &Path) -> Result<PathBuf, InfraError> {
    let path = config_dir.join(CONFIG_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_file())?;
        fs::write(&path, format!("{formatted}\n"))?;
    }
    Ok(path)
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

pub fn load_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = read_config(&config_dir.join(CONFIG_JSON))?;
    let defaults = AppConfig::default();

    let mut config = AppConfig {
        api_base_url: string_field(&file, "apiBaseUrl").unwrap_or(defaults.api_base_url),
        request_timeout_seconds: file
            .get("requestTimeoutSeconds")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.request_timeout_seconds),
        log_level: string_field(&file, "logLevel").unwrap_or(defaults.log_level),
    };

    if let Some(base_url) = lookup_value(&lookup, ENV_API_BASE_URL) {
        config.api_base_url = base_url;
    }
    if let Some(raw) = lookup_value(&lookup, ENV_REQUEST_TIMEOUT_SECONDS) {
        config.request_timeout_seconds = raw.parse().map_err(|_| {
            InfraError::InvalidConfig(format!(
                "{ENV_REQUEST_TIMEOUT_SECONDS} must be a whole number of seconds, got '{raw}'"
            ))
        })?;
    }
    if let Some(level) = lookup_value(&lookup, ENV_LOG_LEVEL) {
        config.log_level = level;
    }

    config.validate()?;
    Ok(config)
}

fn lookup_value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
