//! Server configuration
//!
//! Settings come from a TOML file (every section optional, missing keys take
//! defaults). Credentials never live in the file: they are read from the
//! environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::airport::API_NINJAS_BASE_URL;
use crate::data::schedule::AVIATION_EDGE_BASE_URL;
use crate::freshness::FreshnessPolicy;
use crate::retry::Backoff;
use crate::upstream::Credentials;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_PATH: &str = "flightbar.toml";

/// Aviation Edge key
pub const API_KEY_ENV: &str = "API_KEY";
/// API Ninjas key
pub const AIRPORTS_API_KEY_ENV: &str = "AIRPORTS_API_KEY";
/// Shared secret clients must present
pub const SHARED_SECRET_ENV: &str = "FLIGHTBAR_SECRET";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub freshness: FreshnessPolicy,
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Request-level timeout, above the upstream retry budget
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub aviation_edge_url: String,
    pub airports_url: String,
    /// Per-call timeout
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            aviation_edge_url: AVIATION_EDGE_BASE_URL.to_string(),
            airports_url: API_NINJAS_BASE_URL.to_string(),
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2,
            backoff: Backoff::Fixed,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Directory for the file backend; XDG cache dir when unset
    pub dir: Option<PathBuf>,
    /// TTL for airport entries; unset means they never expire
    pub airport_ttl_secs: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for daily rolling log files; stdout only when unset
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from `flightbar.toml` if present
    ///
    /// An explicitly given path must exist; the default path falls back to
    /// built-in defaults when missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_source(path).map(|(config, _)| config)
    }

    /// Like [`Config::load`], also returning the file that was read
    ///
    /// Does not log, so it can run before logging is initialized. The
    /// source is `None` when built-in defaults were used.
    pub fn load_with_source(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
                Ok((config, Some(path)))
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok((Self::default(), None)),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Parses configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Credentials and shared secret, read from the environment
#[derive(Debug, Clone)]
pub struct Secrets {
    pub credentials: Credentials,
    pub shared_secret: String,
}

impl Secrets {
    /// Reads secrets from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads secrets through `lookup`
    ///
    /// The shared secret is mandatory; provider keys default to empty so the
    /// server can start (upstream calls will then be rejected by the provider).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let shared_secret =
            non_empty(SHARED_SECRET_ENV).ok_or(ConfigError::MissingEnv(SHARED_SECRET_ENV))?;

        Ok(Self {
            credentials: Credentials {
                aviation_edge_key: non_empty(API_KEY_ENV).unwrap_or_default(),
                airports_key: non_empty(AIRPORTS_API_KEY_ENV).unwrap_or_default(),
            },
            shared_secret,
        })
    }
}
