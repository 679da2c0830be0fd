//! Configuration loading for Courier.
//!
//! The config file is TOML, looked up at `$COURIER_CONFIG` or
//! `~/.courier/config.toml`. Every section is optional; missing values fall
//! back to the defaults documented on each field.
//!
//! ```toml
//! [pool]
//! threads = 8
//!
//! [status]
//! timeout_ms = 15000
//! safety_margin_ms = 100
//! primary_url = "https://status-a.internal/applications"
//! secondary_url = "${STATUS_B_URL}"
//!
//! [broadcast]
//! retry_delay_ms = 500
//! max_attempts = 0
//! events_url = "https://hub.internal/events/next"
//! send_url = "https://hub.internal/deliver"
//! ```
//!
//! The status timeout and the broadcast retry delay are deliberately separate
//! values: one bounds a whole status operation, the other is the pause between
//! two rejected deliveries.

use std::env;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "COURIER_CONFIG";

const DEFAULT_THREADS: usize = 4;
const DEFAULT_STATUS_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SAFETY_MARGIN_MS: u64 = 100;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CourierConfig {
    pub pool: PoolConfig,
    pub status: StatusConfig,
    pub broadcast: BroadcastConfig,
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Number of worker threads. Default: 4. Must be at least 1.
    pub threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
        }
    }
}

/// Settings for the racing status operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Overall time budget of one status operation. Default: 15000.
    pub timeout_ms: u64,
    /// Part of the budget reserved for turning the result into a response.
    /// Default: 100. Must be smaller than `timeout_ms`.
    pub safety_margin_ms: u64,
    pub primary_url: Option<String>,
    pub secondary_url: Option<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
            safety_margin_ms: DEFAULT_SAFETY_MARGIN_MS,
            primary_url: None,
            secondary_url: None,
        }
    }
}

impl StatusConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }
}

/// Settings for the fan-out delivery operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Fixed pause between a rejected delivery and its resend. Default: 500.
    pub retry_delay_ms: u64,
    /// Sends per recipient before giving up. `0` (default) retries forever.
    pub max_attempts: u32,
    pub events_url: Option<String>,
    pub send_url: Option<String>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_attempts: 0,
            events_url: None,
            send_url: None,
        }
    }
}

impl BroadcastConfig {
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// `None` means unbounded.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.max_attempts)
    }
}

/// Replace `${VAR}` references with the variable's value (empty if unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_url(field: &'static str, raw: &mut Option<String>) -> Result<(), ConfigError> {
    let Some(value) = raw.as_mut() else {
        return Ok(());
    };
    let expanded = expand_env_vars(value);
    url::Url::parse(&expanded).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("'{expanded}' is not a valid URL: {e}"),
    })?;
    *value = expanded;
    Ok(())
}

impl CourierConfig {
    /// Load the config from the default location.
    ///
    /// Returns `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load, expand and validate the config at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let config = Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => {
                tracing::warn!("Failed to parse config at {}: {source}", path.display());
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            }
            other => other,
        })?;

        tracing::info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Parse, expand and validate config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.resolve()?;
        Ok(config)
    }

    fn resolve(&mut self) -> Result<(), ConfigError> {
        if self.pool.threads == 0 {
            return Err(ConfigError::Invalid {
                field: "pool.threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.status.safety_margin_ms >= self.status.timeout_ms {
            return Err(ConfigError::Invalid {
                field: "status.safety_margin_ms",
                reason: format!(
                    "must be smaller than status.timeout_ms ({})",
                    self.status.timeout_ms
                ),
            });
        }
        if self.broadcast.retry_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast.retry_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        resolve_url("status.primary_url", &mut self.status.primary_url)?;
        resolve_url("status.secondary_url", &mut self.status.secondary_url)?;
        resolve_url("broadcast.events_url", &mut self.broadcast.events_url)?;
        resolve_url("broadcast.send_url", &mut self.broadcast.send_url)?;
        Ok(())
    }
}

/// `$COURIER_CONFIG` if set, else `~/.courier/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".courier").join("config.toml"))
}
