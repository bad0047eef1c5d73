use crate::error::ConfigError;
use clap::ValueEnum;
use std::time::Duration;
use tracing::{info, warn};

pub const APP_TITLE: &str = "Crypto Currency Price Chart";
pub const DEFAULT_LOG_FILTER: &str = "coinchart=info,wgpu_core=error,wgpu_hal=error";
pub const DEFAULT_LOG_FILE: &str = "coinchart.log";

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// How far back the custom start-date picker begins.
pub const CUSTOM_RANGE_DEFAULT_DAYS: i64 = 30;

pub const ENV_DATA_PROVIDER: &str = "COINCHART_DATA_PROVIDER";
pub const ENV_YAHOO_BASE_URL: &str = "COINCHART_YAHOO_BASE_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "COINCHART_HTTP_TIMEOUT_SECS";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DataProvider {
    #[default]
    Yahoo,
    Mock,
}

impl DataProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Mock => "mock",
        }
    }

    fn from_env_value(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yahoo" | "yfinance" => Self::Yahoo,
            "mock" | "offline" => Self::Mock,
            other => {
                warn!(
                    "Unknown {}={} ; defaulting to yahoo. Allowed values: yahoo | mock",
                    ENV_DATA_PROVIDER, other
                );
                Self::Yahoo
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub provider: DataProvider,
    pub yahoo_base_url: String,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DataProvider::default(),
            yahoo_base_url: YAHOO_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(raw) = non_empty(lookup(ENV_DATA_PROVIDER)) {
            settings.provider = DataProvider::from_env_value(&raw);
        }

        if let Some(url) = non_empty(lookup(ENV_YAHOO_BASE_URL)) {
            settings.yahoo_base_url = url;
        }

        if let Some(raw) = non_empty(lookup(ENV_HTTP_TIMEOUT_SECS)) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Env { key: ENV_HTTP_TIMEOUT_SECS, value: raw.clone() })?;
            settings.http_timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    /// Command-line flags win over the environment.
    pub fn with_provider_override(mut self, provider: Option<DataProvider>) -> Self {
        if let Some(provider) = provider {
            info!("Data provider overridden from command line: {}", provider.as_str());
            self.provider = provider;
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
