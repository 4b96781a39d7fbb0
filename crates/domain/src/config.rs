//! Environment-driven configuration structures shared by all binaries.

use std::{env, time::Duration};

use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(12_000);
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_RESOLVER_WORKERS: usize = 2;

/// API-specific configuration (HTTP bind + optional database) so the HTTP
/// surface does not depend on monitor-only environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_bind_address: String,
    database_url: Option<String>,
}

impl ApiConfig {
    /// Loads only the environment variables required by the HTTP surface.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            database_url: get_optional_var("DATABASE_URL"),
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    /// `None` selects the in-memory transaction store.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

/// Knobs for the block discovery / transaction resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    rpc_url: String,
    poll_interval: Duration,
    start_block: u64,
    resolver_workers: usize,
    rpc_timeout: Duration,
}

impl MonitorConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_block: 0,
            resolver_workers: DEFAULT_RESOLVER_WORKERS,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// monitor variables. Missing or malformed entries surface as
    /// `ConfigError` so binaries can respond gracefully.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let rpc_url = get_required_var("LEDGER_RPC_URL")?;
        let poll_interval = match get_optional_var("MONITOR_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_positive("MONITOR_POLL_INTERVAL_MS", &raw)?),
            None => DEFAULT_POLL_INTERVAL,
        };
        let start_block = match get_optional_var("MONITOR_START_BLOCK") {
            Some(raw) => raw.parse().map_err(|source| ConfigError::InvalidNumber {
                key: "MONITOR_START_BLOCK",
                source,
            })?,
            None => 0,
        };
        let resolver_workers = match get_optional_var("MONITOR_RESOLVER_WORKERS") {
            Some(raw) => parse_positive("MONITOR_RESOLVER_WORKERS", &raw)? as usize,
            None => DEFAULT_RESOLVER_WORKERS,
        };
        let rpc_timeout = match get_optional_var("MONITOR_RPC_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_positive("MONITOR_RPC_TIMEOUT_MS", &raw)?),
            None => DEFAULT_RPC_TIMEOUT,
        };

        Ok(Self {
            rpc_url,
            poll_interval,
            start_block,
            resolver_workers,
            rpc_timeout,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.start_block = start_block;
        self
    }

    pub fn with_resolver_workers(mut self, workers: usize) -> Self {
        self.resolver_workers = workers.max(1);
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Zero means "start from the first observed chain head".
    pub fn start_block(&self) -> u64 {
        self.start_block
    }

    pub fn resolver_workers(&self) -> usize {
        self.resolver_workers
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw
        .parse()
        .map_err(|source| ConfigError::InvalidNumber { key, source })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("LEDGER_WATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid value in `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
