// Client configuration, injected at startup
use std::env;
use std::time::Duration;

use crate::api::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads `BOOKING_API_URL`, `BOOKING_API_TIMEOUT_MS` and `LOG_LEVEL`,
    /// loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            base_url: env::var("BOOKING_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout_ms: parse_or_default("BOOKING_API_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, ClientError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| ClientError::ConfigError(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_timeout_and_empty_url() {
        let config = ClientConfig::new("http://localhost:8000").with_timeout_ms(0);
        assert!(matches!(config.validate(), Err(ClientError::ConfigError(_))));

        let config = ClientConfig::new("  ");
        assert!(matches!(config.validate(), Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_parse_or_default_reports_bad_values() {
        env::set_var("BUS_BOOKING_TEST_TIMEOUT", "soon");
        let result = parse_or_default::<u64>("BUS_BOOKING_TEST_TIMEOUT", 5);
        assert!(matches!(result, Err(ClientError::ConfigError(msg)) if msg.contains("BUS_BOOKING_TEST_TIMEOUT")));

        env::remove_var("BUS_BOOKING_TEST_TIMEOUT_UNSET");
        assert_eq!(parse_or_default::<u64>("BUS_BOOKING_TEST_TIMEOUT_UNSET", 5).unwrap(), 5);
    }
}
