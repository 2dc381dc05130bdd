//! Configuration for the booking client.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::calendar::CalendarPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default pricing, calendar and status service
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5002";

/// Default booking and payment gateway
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:5001";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("{name} has an invalid value: {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// A URL is not http(s)
    #[error("{name} must be an http(s) URL, got {value:?}")]
    NotHttp {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// A value must be positive
    #[error("{name} must be greater than zero")]
    Zero {
        /// Variable name
        name: &'static str,
    },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Pricing, calendar and status service (`MUSEUM_BACKEND_URL`)
    pub backend_url: String,
    /// Booking creation and payment gateway (`MUSEUM_GATEWAY_URL`)
    pub gateway_url: String,
    /// Timeout applied to every outbound request (`MUSEUM_REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Calendar `Limited` threshold (`MUSEUM_LIMITED_THRESHOLD`)
    pub limited_threshold: u32,
    /// Use the in-memory backend instead of HTTP (`MUSEUM_OFFLINE`)
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            limited_threshold: CalendarPolicy::DEFAULT_LIMITED_THRESHOLD,
            offline: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            backend_url: lookup("MUSEUM_BACKEND_URL").unwrap_or(defaults.backend_url),
            gateway_url: lookup("MUSEUM_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            request_timeout: parse(&lookup, "MUSEUM_REQUEST_TIMEOUT_SECS")?
                .map_or(defaults.request_timeout, Duration::from_secs),
            limited_threshold: parse(&lookup, "MUSEUM_LIMITED_THRESHOLD")?
                .unwrap_or(defaults.limited_threshold),
            offline: parse_flag(&lookup, "MUSEUM_OFFLINE")?.unwrap_or(defaults.offline),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero threshold or timeout, or a URL that
    /// is not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("MUSEUM_BACKEND_URL", &self.backend_url)?;
        check_url("MUSEUM_GATEWAY_URL", &self.gateway_url)?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Zero {
                name: "MUSEUM_REQUEST_TIMEOUT_SECS",
            });
        }
        if self.limited_threshold == 0 {
            return Err(ConfigError::Zero {
                name: "MUSEUM_LIMITED_THRESHOLD",
            });
        }
        Ok(())
    }

    /// Calendar classification policy
    #[must_use]
    pub const fn calendar_policy(&self) -> CalendarPolicy {
        CalendarPolicy {
            limited_threshold: self.limited_threshold,
        }
    }
}

fn parse<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

fn parse_flag<F>(lookup: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        })
        .transpose()
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let lower = value.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::NotHttp {
            name,
            value: value.to_string(),
        }),
    }
}
