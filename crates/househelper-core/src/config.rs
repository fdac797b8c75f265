use std::env;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

const ENV_BASE_URL: &str = "HOUSEHELPER_BASE_URL";
const ENV_API_PREFIX: &str = "HOUSEHELPER_API_PREFIX";
const ENV_INJECT_BEARER: &str = "HOUSEHELPER_INJECT_BEARER";
const ENV_ENCODE_QUERY: &str = "HOUSEHELPER_ENCODE_QUERY";

/// Backend endpoint paths, relative to the API prefix.
pub struct Endpoints;

impl Endpoints {
    pub const HOUSE_TRANSACTIONS: &'static str = "/house-transactions";
    pub const USER_INFO: &'static str = "/users/me";
    pub const WECHAT_LOGIN: &'static str = "/users/wxlogin";
    pub const HEALTH_CHECK: &'static str = "/health";
    pub const SYSTEM_INFO: &'static str = "/info";
}

/// Deployment settings for the request layer.
///
/// Deployments disagree on whether the bearer header is attached automatically
/// and whether query components are percent-encoded, so both are switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub inject_bearer_header: bool,
    pub encode_query_params: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_prefix: DEFAULT_API_PREFIX.to_owned(),
            inject_bearer_header: true,
            encode_query_params: true,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: api_prefix.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from defaults overridden by `HOUSEHELPER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(prefix) = lookup(ENV_API_PREFIX) {
            config.api_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_INJECT_BEARER) {
            config.inject_bearer_header = parse_flag(ENV_INJECT_BEARER, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ENCODE_QUERY) {
            config.encode_query_params = parse_flag(ENV_ENCODE_QUERY, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_bearer_header(mut self, enabled: bool) -> Self {
        self.inject_bearer_header = enabled;
        self
    }

    pub fn with_query_encoding(mut self, enabled: bool) -> Self {
        self.encode_query_params = enabled;
        self
    }

    /// Check that the base URL parses as an absolute URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            value: self.base_url.clone(),
            source,
        })?;
        Ok(())
    }

    /// `base_url + api_prefix + endpoint`, joined verbatim.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, endpoint)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: raw.to_owned(),
        }),
    }
}

/// Locates the per-user directory holding persisted session data.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
}

impl ConfigLocator {
    /// Attempt to discover the persistent configuration directory, creating it if needed.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("app", "househelper", "househelper")
            .ok_or(ConfigError::MissingProjectDirs)?;
        Self::from_root(dirs.config_dir().to_path_buf())
    }

    /// Use an explicit directory, creating it if needed.
    pub fn from_root(root: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&root).map_err(ConfigError::CreateDir)?;
        set_user_only_permissions(&root)?;
        Ok(Self { root })
    }

    /// Path to the session file for the given profile.
    pub fn session_file(&self, profile: &str) -> PathBuf {
        self.root.join(format!("session-{profile}.json"))
    }
}

fn set_user_only_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory for househelper")]
    MissingProjectDirs,
    #[error("failed to create configuration directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("filesystem error: {0}")]
    Io(#[source] std::io::Error),
    #[error("invalid base URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid value '{value}' for {key}; expected true or false")]
    InvalidFlag { key: &'static str, value: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}
