//! Configuration management for the windrose resolver
//!
//! This module handles loading and validating configuration from
//! environment variables, a TOML file, and command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch resolver configuration
    pub resolver: ResolverConfig,

    /// Shared HTTP transport configuration
    pub http: HttpConfig,

    /// Per-provider switches and credentials
    pub providers: ProvidersConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Batch resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Input CSV of address records
    pub input: PathBuf,

    /// Durable result store path
    pub store: PathBuf,

    /// Preload the store from a prior run's output
    pub preload: bool,

    /// Newly processed records per burst
    pub burst_size: usize,

    /// Cooldown between bursts, in milliseconds
    pub cooldown_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("addresses.csv"),
            store: PathBuf::from("results.csv"),
            preload: false,
            burst_size: 20,
            cooldown_ms: 500,
        }
    }
}

/// Shared HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Outbound requests per second across all providers
    pub rate_limit: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            rate_limit: 5,
            user_agent: format!("windrose/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Per-provider switches and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub ptv: ProviderSettings,
    pub google: ProviderSettings,
    pub bing: ProviderSettings,
}

/// One provider's switch and credential
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Query this provider during resolution
    pub enabled: bool,

    /// API key, carried per the provider's auth scheme
    pub api_key: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(input) = std::env::var("WINDROSE_INPUT").ok().filter(|v| !v.is_empty()) {
            config.resolver.input = input.into();
        }
        if let Some(store) = std::env::var("WINDROSE_STORE").ok().filter(|v| !v.is_empty()) {
            config.resolver.store = store.into();
        }
        config.resolver.preload = env_flag("WINDROSE_PRELOAD");
        config.resolver.burst_size = std::env::var("WINDROSE_BURST_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(config.resolver.burst_size);
        config.resolver.cooldown_ms = std::env::var("WINDROSE_COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(config.resolver.cooldown_ms);

        config.http.request_timeout_secs = std::env::var("WINDROSE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(config.http.request_timeout_secs);
        config.http.rate_limit = std::env::var("WINDROSE_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(config.http.rate_limit);
        if let Ok(user_agent) = std::env::var("WINDROSE_USER_AGENT") {
            config.http.user_agent = user_agent;
        }

        config.providers.ptv.enabled = env_flag("WINDROSE_USE_PTV");
        config.providers.ptv.api_key = std::env::var("WINDROSE_PTV_APIKEY").unwrap_or_default();
        config.providers.google.enabled = env_flag("WINDROSE_USE_GOOGLE");
        config.providers.google.api_key =
            std::env::var("WINDROSE_GOOGLE_APIKEY").unwrap_or_default();
        config.providers.bing.enabled = env_flag("WINDROSE_USE_BING");
        config.providers.bing.api_key = std::env::var("WINDROSE_BING_APIKEY").unwrap_or_default();

        config.logging.level =
            std::env::var("WINDROSE_LOG_LEVEL").unwrap_or(config.logging.level);
        config.logging.format =
            std::env::var("WINDROSE_LOG_FORMAT").unwrap_or(config.logging.format);

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.resolver.burst_size == 0 {
            anyhow::bail!("resolver.burst_size must be at least 1");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("http.request_timeout_secs must be at least 1");
        }

        let enabled: Vec<(&str, &ProviderSettings)> = [
            ("ptv", &self.providers.ptv),
            ("google", &self.providers.google),
            ("bing", &self.providers.bing),
        ]
        .into_iter()
        .filter(|(_, settings)| settings.enabled)
        .collect();

        if enabled.is_empty() {
            anyhow::bail!("at least one provider must be enabled");
        }

        for (name, settings) in enabled {
            if settings.api_key.is_empty() {
                anyhow::bail!("provider '{name}' is enabled but has no API key");
            }
        }

        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
