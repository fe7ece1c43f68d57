//! Configuration for flagwire consumers.
//!
//! Layers, lowest to highest priority: built-in defaults, the TOML file at
//! [`config_path`], `FLAGD_*` environment variables (the names other flagd
//! clients understand), then `FLAGWIRE_*` environment variables. The result
//! translates into a [`flagwire_core::ResolverConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use flagwire_core::{CacheConfig, EndpointConfig, ResolverConfig, StreamConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Cache strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Lru,
    Disabled,
}

/// Everything a flagwire consumer can configure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Evaluation service host.
    pub host: String,
    pub port: u16,
    /// Use TLS for host/port connections.
    pub tls: bool,
    /// Unix socket path. Takes precedence over host/port.
    pub socket_path: Option<PathBuf>,
    /// Extra CA certificate (PEM) trusted for the TLS connection.
    pub cert_path: Option<PathBuf>,
    /// Full endpoint URI (`http://`, `https://`, `unix://`). Overrides
    /// host, port, tls and socket path when set.
    pub endpoint: Option<String>,

    /// Per-request deadline, milliseconds.
    pub deadline_ms: u64,

    pub cache: CacheKind,
    pub max_cache_size: usize,

    /// Reconnect attempts before the event stream gives up.
    pub max_event_stream_retries: u32,
    /// First reconnect delay, milliseconds. Doubles per failure.
    pub retry_backoff_ms: u64,

    /// Provider name stamped on emitted events.
    pub provider_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8013,
            tls: false,
            socket_path: None,
            cert_path: None,
            endpoint: None,
            deadline_ms: 500,
            cache: CacheKind::Lru,
            max_cache_size: 1000,
            max_event_stream_retries: 5,
            retry_backoff_ms: 1000,
            provider_name: "flagd".into(),
        }
    }
}

impl Config {
    /// The URI the channel connects to.
    pub fn endpoint_uri(&self) -> String {
        if let Some(ref endpoint) = self.endpoint {
            return endpoint.clone();
        }
        if let Some(ref socket) = self.socket_path {
            return socket_uri(socket);
        }
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_none() && self.socket_path.is_none() {
            if self.host.trim().is_empty() {
                return Err(invalid("host", "must not be empty"));
            }
            if self.port == 0 {
                return Err(invalid("port", "must be between 1 and 65535"));
            }
        }
        if self
            .socket_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(invalid("socket_path", "must not be empty"));
        }
        if self.deadline_ms == 0 {
            return Err(invalid("deadline_ms", "must be greater than zero"));
        }
        if self.retry_backoff_ms == 0 {
            return Err(invalid("retry_backoff_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Translate into the runtime resolver configuration.
    pub fn to_resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        self.validate()?;

        let mut endpoint = EndpointConfig::new(self.endpoint_uri());
        if let Some(ref cert) = self.cert_path {
            endpoint = endpoint.with_ca_cert(cert);
        }

        Ok(ResolverConfig {
            endpoint,
            deadline: Duration::from_millis(self.deadline_ms),
            cache: match self.cache {
                CacheKind::Lru => CacheConfig {
                    enabled: true,
                    max_size: self.max_cache_size,
                },
                CacheKind::Disabled => CacheConfig::disabled(),
            },
            stream: StreamConfig {
                max_retries: self.max_event_stream_retries,
                base_backoff: Duration::from_millis(self.retry_backoff_ms),
            },
            provider_name: self.provider_name.clone(),
        })
    }

    /// Pretty TOML, as written on disk.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `unix://` URI for a socket path. Relative paths are anchored at the
/// working directory and the path is percent-encoded, so neither a leading
/// segment nor a space can be misread as URI syntax.
fn socket_uri(socket: &Path) -> String {
    let absolute = std::path::absolute(socket).unwrap_or_else(|_| socket.to_path_buf());
    Url::from_file_path(&absolute).map_or_else(
        |()| format!("unix://{}", absolute.display()),
        |file_url| format!("unix://{}", file_url.path()),
    )
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "flagwire", "flagwire").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("flagwire");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// The layered provider stack rooted at `path`. A missing file is fine.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLAGD_").map(|key| {
            if key.as_str().eq_ignore_ascii_case("server_cert_path") {
                "cert_path".into()
            } else {
                key.into()
            }
        }))
        .merge(Env::prefixed("FLAGWIRE_"))
}

/// Load from an explicit file, plus environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    Ok(config)
}

/// Load from the platform config file, plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Tests ───────────────────────────────────────────────────────────
