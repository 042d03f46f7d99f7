//! Client Configuration
//!
//! Configuration types for the client engine, loaded from environment
//! variables with sensible defaults.

use std::time::Duration;

/// Default reassembly ceiling: a message larger than this is treated as
/// corrupt rather than buffered further (5 MB).
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 5 * 1024 * 1024;

/// Default capacity of each subscription's notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 16;

/// Reconnection backoff settings.
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    /// Delay before the second dial attempt.
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Jitter factor as a fraction (e.g. 0.1 = ±10% randomization).
    ///
    /// Zero by default, which yields the exact 1s, 2s, 4s, ..., 60s
    /// redial cadence.
    pub jitter_factor: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

/// Configuration for a [`PythClient`](crate::PythClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the pythd RPC endpoint.
    pub url: String,
    /// Reconnection backoff settings.
    pub reconnect: ReconnectSettings,
    /// Ceiling on the frame reassembly buffer, in bytes.
    pub reassembly_capacity: usize,
    /// Capacity of each subscription's notification channel.
    pub notification_capacity: usize,
}

impl ClientConfig {
    /// Create a configuration for the given endpoint with default tuning.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectSettings::default(),
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `PYTHD_WS_URL` is required; every tuning knob falls back to its
    /// default when unset or unparseable.
    ///
    /// # Errors
    ///
    /// Returns an error if `PYTHD_WS_URL` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("PYTHD_WS_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PYTHD_WS_URL".to_string()))?;

        if url.is_empty() {
            return Err(ConfigError::EmptyValue("PYTHD_WS_URL".to_string()));
        }

        let defaults = ReconnectSettings::default();
        let reconnect = ReconnectSettings {
            initial_delay: parse_env_duration_millis(
                "PYTHD_RECONNECT_DELAY_INITIAL_MS",
                defaults.initial_delay,
            ),
            max_delay: parse_env_duration_secs("PYTHD_RECONNECT_DELAY_MAX_SECS", defaults.max_delay),
            multiplier: parse_env_f64("PYTHD_RECONNECT_DELAY_MULTIPLIER", defaults.multiplier),
            jitter_factor: parse_env_f64("PYTHD_RECONNECT_JITTER", defaults.jitter_factor),
        };

        Ok(Self {
            url,
            reconnect,
            reassembly_capacity: parse_env_usize(
                "PYTHD_REASSEMBLY_CAPACITY_BYTES",
                DEFAULT_REASSEMBLY_CAPACITY,
            ),
            notification_capacity: parse_env_usize(
                "PYTHD_NOTIFICATION_CAPACITY",
                DEFAULT_NOTIFICATION_CAPACITY,
            ),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_values() {
        let config = ClientConfig::new("ws://127.0.0.1:8910");
        assert_eq!(config.url, "ws://127.0.0.1:8910");
        assert_eq!(config.reassembly_capacity, 5 * 1024 * 1024);
        assert_eq!(config.notification_capacity, 16);
        assert_eq!(config.reconnect.initial_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect.max_delay, Duration::from_secs(60));
        assert!((config.reconnect.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(config.reconnect.jitter_factor.abs() < f64::EPSILON);
    }
}
