//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use reportflow_reports::DEFAULT_COLUMN_LIMIT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_FILTER_VALIDATION_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Remote GraphQL filter validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterValidationConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Parse-only filter validation when unset.
    pub filter_validation: Option<FilterValidationConfig>,
    pub column_limit: usize,
    pub keep_artifact_on_success: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&get, "REPORTFLOW_BIND_ADDR", || {
            SocketAddr::from(([0, 0, 0, 0], 8080))
        })?;

        let filter_validation = match get("REPORTFLOW_FILTER_VALIDATION_URL") {
            Some(url) => {
                let timeout_ms = parse_or(&get, "REPORTFLOW_FILTER_VALIDATION_TIMEOUT_MS", || {
                    DEFAULT_FILTER_VALIDATION_TIMEOUT.as_millis() as u64
                })?;
                Some(FilterValidationConfig {
                    url,
                    token: get("REPORTFLOW_FILTER_VALIDATION_TOKEN"),
                    timeout: Duration::from_millis(timeout_ms),
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            filter_validation,
            column_limit: parse_or(&get, "REPORTFLOW_COLUMN_LIMIT", || DEFAULT_COLUMN_LIMIT)?,
            keep_artifact_on_success: parse_flag(&get, "REPORTFLOW_KEEP_ARTIFACT_ON_SUCCESS")?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            filter_validation: None,
            column_limit: DEFAULT_COLUMN_LIMIT,
            keep_artifact_on_success: false,
        }
    }
}

fn parse_or<T, G, D>(get: &G, var: &'static str, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
    D: FnOnce() -> T,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default()),
    }
}

fn parse_flag<G>(get: &G, var: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}
