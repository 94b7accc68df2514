//! Dashboard configuration.
//!
//! Configuration is layered: the embedded `config/default.toml` first,
//! then an optional user TOML file merged over it key by key, then
//! environment variable overrides (`CRIME_DASH_API_URL`, `BIND_ADDR`,
//! `PORT`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use crime_dash_analytics_models::{FilterSelection, IntensityTiers, TiersError};
use crime_dash_source::http::HttpSourceConfig;
use crime_dash_source::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable overriding the incident service URL.
pub const API_URL_ENV: &str = "CRIME_DASH_API_URL";

/// Environment variable naming a user config file for the server binary.
pub const CONFIG_PATH_ENV: &str = "CRIME_DASH_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML is malformed or has the wrong shape.
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Heat intensity tiers are inconsistent.
    #[error(transparent)]
    Tiers(#[from] TiersError),

    /// A value is out of range.
    #[error("Invalid config value for {key}: {message}")]
    Invalid {
        /// Dotted config key.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub cache_ttl_secs: u64,
    /// Upper bound on a whole refresh, all pages included.
    pub refresh_timeout_secs: u64,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl SourceSettings {
    /// Settings for the HTTP incident source.
    #[must_use]
    pub fn http_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
            page_delay: Duration::from_millis(self.page_delay_ms),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            max_pages: self.max_pages,
        }
    }

    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// `[analytics]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    pub top_limit: usize,
    pub hotspot_threshold: f64,
    pub narcotics_keyword: String,
    /// Offset of the dashboard's local time from UTC.
    pub utc_offset_minutes: i32,
    pub intensity: IntensityTiers,
}

impl AnalyticsSettings {
    /// The local UTC offset, if in range.
    #[must_use]
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

/// `[filters]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub history_capacity: usize,
    /// Selection used at startup and by reset.
    pub default: FilterSelection,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub port: u16,
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub source: SourceSettings,
    pub analytics: AnalyticsSettings,
    pub filters: FilterSettings,
    pub server: ServerSettings,
}

impl DashboardConfig {
    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// * If the embedded TOML does not parse
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_layers(None)
    }

    /// Loads the defaults, merges `path` over them if given, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// * If `path` cannot be read
    /// * If either TOML layer is malformed
    /// * If a value is out of range
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let user = path
            .map(|path| {
                log::debug!("Loading config from {}", path.display());
                std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .transpose()?;

        let mut config = Self::from_layers(user.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses the defaults with `user` merged over them. No environment
    /// lookups and no validation.
    ///
    /// # Errors
    ///
    /// * If either TOML layer is malformed
    pub fn from_layers(user: Option<&str>) -> Result<Self, ConfigError> {
        let mut table: toml::Table = DEFAULT_TOML.parse()?;
        if let Some(user) = user {
            merge(&mut table, user.parse()?);
        }
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Applies `CRIME_DASH_API_URL`, `BIND_ADDR` and `PORT` from `lookup`.
    /// An unparseable `PORT` is ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV) {
            self.source.base_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Ignoring PORT={port}: {e}"),
            }
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// * If the hotspot threshold is outside `0.0..=1.0`
    /// * If the UTC offset is out of range
    /// * If the intensity tiers are inconsistent
    /// * If the top limit or history capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.analytics.hotspot_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "analytics.hotspot_threshold",
                message: format!("{threshold} is not within 0.0..=1.0"),
            });
        }
        if self.analytics.utc_offset().is_none() {
            return Err(ConfigError::Invalid {
                key: "analytics.utc_offset_minutes",
                message: format!("{} is out of range", self.analytics.utc_offset_minutes),
            });
        }
        if self.analytics.top_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "analytics.top_limit",
                message: "must be at least 1".to_string(),
            });
        }
        if self.filters.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "filters.history_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        self.analytics.intensity.validate()?;
        Ok(())
    }
}

/// Merges `overlay` into `base`; nested tables merge, everything else is
/// replaced.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}
