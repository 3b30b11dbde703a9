// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the paste service.
//!
//! Values come from an optional `paste.toml` next to the binary and from
//! `PASTE_`-prefixed environment variables, with `__` separating nested
//! keys (e.g. `PASTE_RATE_LIMIT__CREATE__BURST=20`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid {tier} tier policy: {reason}")]
    InvalidTier { tier: &'static str, reason: String },

    #[error("Invalid header name {0:?}")]
    InvalidHeader(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// Configuration for the paste service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database file (default: paste.db)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory served for static assets (default: assets)
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Maximum paste size in bytes (default: 512 KiB)
    #[serde(default = "default_max_paste_bytes")]
    pub max_paste_bytes: usize,

    /// Header carrying the client address when running behind a trusted
    /// reverse proxy, e.g. `CF-Connecting-IP`. Unset means the peer address
    /// of the connection is used.
    #[serde(default)]
    pub trusted_proxy_header: Option<String>,

    /// Header carrying the client country code (default: CF-IPCountry)
    #[serde(default = "default_country_header")]
    pub country_header: String,

    /// Grace period for in-flight requests on shutdown (default: 5)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Token bucket policy for one admission tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Sustained permits per second
    pub rate: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl TierPolicy {
    pub const fn new(rate: f64, burst: u32) -> Self {
        Self { rate, burst }
    }

    /// One permit every `interval`, up to `burst` at once.
    pub fn every(interval: Duration, burst: u32) -> Self {
        Self::new(1.0 / interval.as_secs_f64(), burst)
    }

    /// Time needed to refill a single permit, saturating at
    /// [`Duration::MAX`] for rates too small to represent.
    pub fn refill_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate).unwrap_or(Duration::MAX)
    }

    fn validate(&self, tier: &'static str) -> Result<(), ConfigError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::InvalidTier {
                tier,
                reason: format!("rate must be a positive number, got {}", self.rate),
            });
        }
        if self.burst == 0 {
            return Err(ConfigError::InvalidTier {
                tier,
                reason: "burst must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Rate limiting configuration for both admission tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Applied to every request (default: 5/s, burst 50)
    #[serde(default = "default_global_tier")]
    pub global: TierPolicy,

    /// Applied to paste creation only (default: 1 per 5s, burst 10)
    #[serde(default = "default_create_tier")]
    pub create: TierPolicy,

    /// Entries idle longer than this are evicted (default: 60)
    #[serde(default = "default_idle_window_secs")]
    pub idle_window_secs: u64,

    /// How often idle entries are swept (default: 10)
    #[serde(default = "default_reclaim_interval_secs")]
    pub reclaim_interval_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_path() -> String {
    "paste.db".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_max_paste_bytes() -> usize {
    512 * 1024
}

fn default_country_header() -> String {
    "CF-IPCountry".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_global_tier() -> TierPolicy {
    TierPolicy::new(5.0, 50)
}

fn default_create_tier() -> TierPolicy {
    TierPolicy::every(Duration::from_secs(5), 10)
}

fn default_idle_window_secs() -> u64 {
    60
}

fn default_reclaim_interval_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            assets_dir: default_assets_dir(),
            max_paste_bytes: default_max_paste_bytes(),
            trusted_proxy_header: None,
            country_header: default_country_header(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global: default_global_tier(),
            create: default_create_tier(),
            idle_window_secs: default_idle_window_secs(),
            reclaim_interval_secs: default_reclaim_interval_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from `paste.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("paste").required(false))
            .add_source(
                ::config::Environment::with_prefix("PASTE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit.global.validate("global")?;
        self.rate_limit.create.validate("create")?;
        if self.rate_limit.idle_window_secs == 0 {
            return Err(ConfigError::ZeroValue("rate_limit.idle_window_secs"));
        }
        if self.rate_limit.reclaim_interval_secs == 0 {
            return Err(ConfigError::ZeroValue("rate_limit.reclaim_interval_secs"));
        }
        if self.max_paste_bytes == 0 {
            return Err(ConfigError::ZeroValue("max_paste_bytes"));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl RateLimitConfig {
    /// Get the idle eviction window
    pub fn idle_window(&self) -> Duration {
        Duration::from_secs(self.idle_window_secs)
    }

    /// Get the reclamation interval
    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }
}
