use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CloudlogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Static bearer token from configuration.
    #[default]
    Token,
    /// Token and default project from the GCE metadata server.
    Gce,
}

impl FromStr for AuthType {
    type Err = CloudlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "gce" => Ok(Self::Gce),
            "jwt" => Err(CloudlogError::Config(
                "auth type jwt (service account key) is not supported".into(),
            )),
            other => Err(CloudlogError::Config(format!("unknown auth type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub listen_addr: String,
    pub logging_endpoint: String,
    pub resource_manager_endpoint: String,
    pub metadata_endpoint: String,
    pub auth_type: AuthType,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub default_project: Option<String>,
    pub request_timeout: Duration,
    pub default_max_results: usize,
    pub max_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3100".to_string(),
            logging_endpoint: "https://logging.googleapis.com".to_string(),
            resource_manager_endpoint: "https://cloudresourcemanager.googleapis.com".to_string(),
            metadata_endpoint: "http://metadata.google.internal".to_string(),
            auth_type: AuthType::Token,
            access_token: None,
            default_project: None,
            request_timeout: Duration::from_secs(30),
            default_max_results: 1000,
            max_page_size: 1000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(CloudlogError::Config("max_page_size must be positive".into()));
        }
        if self.default_max_results == 0 {
            return Err(CloudlogError::Config(
                "default_max_results must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    listen_addr: Option<String>,
    logging_endpoint: Option<String>,
    resource_manager_endpoint: Option<String>,
    metadata_endpoint: Option<String>,
    auth_type: Option<String>,
    access_token: Option<String>,
    default_project: Option<String>,
    request_timeout: Option<String>,
    default_max_results: Option<usize>,
    max_page_size: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("CLOUDLOG_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("cloudlog/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| CloudlogError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| CloudlogError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        listen_addr: env::var("CLOUDLOG_LISTEN_ADDR").ok(),
        logging_endpoint: env::var("CLOUDLOG_LOGGING_ENDPOINT").ok(),
        resource_manager_endpoint: env::var("CLOUDLOG_RESOURCE_MANAGER_ENDPOINT").ok(),
        metadata_endpoint: env::var("CLOUDLOG_METADATA_ENDPOINT").ok(),
        auth_type: env::var("CLOUDLOG_AUTH_TYPE").ok(),
        access_token: env::var("CLOUDLOG_ACCESS_TOKEN").ok(),
        default_project: env::var("CLOUDLOG_DEFAULT_PROJECT").ok(),
        request_timeout: env::var("CLOUDLOG_REQUEST_TIMEOUT").ok(),
        default_max_results: env_usize("CLOUDLOG_DEFAULT_MAX_RESULTS")?,
        max_page_size: env_usize("CLOUDLOG_MAX_PAGE_SIZE")?,
    })
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|e| CloudlogError::Config(format!("bad {name} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.listen_addr {
        cfg.listen_addr = v;
    }
    if let Some(v) = overrides.logging_endpoint {
        cfg.logging_endpoint = v;
    }
    if let Some(v) = overrides.resource_manager_endpoint {
        cfg.resource_manager_endpoint = v;
    }
    if let Some(v) = overrides.metadata_endpoint {
        cfg.metadata_endpoint = v;
    }
    if let Some(v) = overrides.auth_type {
        cfg.auth_type = v.parse().map_err(|e| {
            CloudlogError::Config(format!("bad auth_type in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.access_token.filter(|v| !v.is_empty()) {
        cfg.access_token = Some(v);
    }
    if let Some(v) = overrides.default_project.filter(|v| !v.is_empty()) {
        cfg.default_project = Some(v);
    }
    if let Some(v) = overrides.request_timeout {
        cfg.request_timeout = humantime::parse_duration(&v).map_err(|e| {
            CloudlogError::Config(format!("bad request_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.default_max_results {
        cfg.default_max_results = v;
    }
    if let Some(v) = overrides.max_page_size {
        cfg.max_page_size = v;
    }
    Ok(())
}
