//! Configuration loading helpers.
//!
//! A [`ClientConfig`] is an explicit value handed to
//! [`DbClient::create`](crate::DbClient::create). It can be built in code,
//! read from a TOML file, or assembled from the environment:
//!
//! ```toml
//! host = "db.internal"
//! bucket = "saves"
//! user = "game"
//! password = "secret"
//! on_fatal = "abort"
//!
//! [memory]
//! latency_us = 500
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::connection::FatalAction;

/// Environment variable naming a TOML file to load first.
pub const CONFIG_PATH_VAR: &str = "DOCKV_CONFIG";

/// Prefix of per-field environment overrides (`DOCKV__BUCKET=saves`).
pub const OVERRIDE_PREFIX: &str = "DOCKV__";

/// Errors returned by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading config files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Invalid value for a key.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown configuration key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Connection settings for one client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Backend host
    pub host: String,
    /// User name; empty means anonymous
    pub user: String,
    /// Password; empty means none
    pub password: String,
    /// Bucket (namespace) to open
    pub bucket: String,
    /// Driver name
    pub backend: String,
    /// What to do once a fatal completion has been reported
    pub on_fatal: FatalAction,
    /// In-memory driver tuning
    pub memory: MemoryOptions,
}

/// Longest response delay the in-memory driver accepts, in microseconds
pub const MAX_MEMORY_DELAY_US: u64 = 3_600_000_000;

/// Tuning for the in-memory driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryOptions {
    /// Delay before each response becomes available
    pub latency_us: u64,
    /// Random extra delay added on top of `latency_us`
    pub jitter_us: u64,
}

impl MemoryOptions {
    /// Base response latency
    pub fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_us)
    }

    /// Maximum random extra latency
    pub fn jitter(&self) -> Duration {
        Duration::from_micros(self.jitter_us)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: String::new(),
            password: String::new(),
            bucket: "default".to_string(),
            backend: "memory".to_string(),
            on_fatal: FatalAction::default(),
            memory: MemoryOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set user and password.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Select the driver by name.
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = name.into();
        self
    }

    /// Choose what happens after a fatal completion.
    pub fn on_fatal(mut self, action: FatalAction) -> Self {
        self.on_fatal = action;
        self
    }

    /// Set the in-memory driver's response latency.
    pub fn memory_latency(mut self, latency: Duration) -> Self {
        self.memory.latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Set the in-memory driver's latency jitter.
    pub fn memory_jitter(mut self, jitter: Duration) -> Self {
        self.memory.jitter_us = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// True when no user is configured.
    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty()
    }

    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from the `DOCKV_CONFIG` file (if set),
    /// then apply `DOCKV__field` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_VAR).ok() {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_overrides(env::vars())?;
        Ok(config)
    }

    /// Apply `DOCKV__field` / `DOCKV__memory__field` overrides in-place.
    ///
    /// Variables without the prefix are ignored; unknown fields are an error.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if !key.starts_with(OVERRIDE_PREFIX) {
                continue;
            }
            let path = key[OVERRIDE_PREFIX.len()..].to_ascii_lowercase();
            let parts: Vec<&str> = path.split("__").collect();
            let value = value.trim().to_string();

            match parts.as_slice() {
                ["host"] => self.host = value,
                ["user"] => self.user = value,
                ["password"] => self.password = value,
                ["bucket"] => self.bucket = value,
                ["backend"] => self.backend = value,
                ["on_fatal"] => self.on_fatal = parse_value(&key, &value)?,
                ["memory", "latency_us"] => self.memory.latency_us = parse_value(&key, &value)?,
                ["memory", "jitter_us"] => self.memory.jitter_us = parse_value(&key, &value)?,
                _ => return Err(ConfigError::UnknownKey(key)),
            }
        }
        Ok(())
    }

    /// Reject settings no driver can connect with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "host".to_string(),
                value: self.host.clone(),
            });
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "bucket".to_string(),
                value: self.bucket.clone(),
            });
        }
        for (key, value) in [
            ("memory.latency_us", self.memory.latency_us),
            ("memory.jitter_us", self.memory.jitter_us),
        ] {
            if value > MAX_MEMORY_DELAY_US {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
