//! Application configuration loaded from environment variables.

use allocation::AllocationPolicy;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Shape of order responses.
///
/// `Compact` returns the allocation only. `Detailed` adds the product name,
/// vendor name and the prices captured at allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseProfile {
    #[default]
    Detailed,
    Compact,
}

impl ResponseProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detailed" => Some(ResponseProfile::Detailed),
            "compact" => Some(ResponseProfile::Compact),
            _ => None,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory demo ledger
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `ALLOCATION_MAX_ATTEMPTS`: resolve attempts per order (default: `3`)
/// - `ORDER_RESPONSE_PROFILE`: `detailed` or `compact` (default: `detailed`)
///
/// Unparseable values fall back to the default.
///
/// Without `DATABASE_URL` the server keeps stock and orders in process
/// memory, seeded with a demo catalog. That mode is for demos and local
/// runs only: nothing survives a restart and stock is not shared between
/// instances. Production deployments must set `DATABASE_URL`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub allocation_max_attempts: u32,
    pub response_profile: ResponseProfile,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            allocation_max_attempts: lookup("ALLOCATION_MAX_ATTEMPTS")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.allocation_max_attempts),
            response_profile: lookup("ORDER_RESPONSE_PROFILE")
                .and_then(|p| ResponseProfile::parse(&p))
                .unwrap_or(defaults.response_profile),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy::new(self.allocation_max_attempts)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            allocation_max_attempts: AllocationPolicy::DEFAULT_MAX_ATTEMPTS,
            response_profile: ResponseProfile::Detailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.allocation_max_attempts, 3);
        assert_eq!(config.response_profile, ResponseProfile::Detailed);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/fulfillment"),
            ("ALLOCATION_MAX_ATTEMPTS", "5"),
            ("ORDER_RESPONSE_PROFILE", "compact"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/fulfillment")
        );
        assert_eq!(config.allocation_policy().max_attempts, 5);
        assert_eq!(config.response_profile, ResponseProfile::Compact);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("LOG_FORMAT", "xml"),
            ("DATABASE_URL", "  "),
            ("ALLOCATION_MAX_ATTEMPTS", "0"),
            ("ORDER_RESPONSE_PROFILE", "verbose"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.database_url, None);
        assert_eq!(config.allocation_max_attempts, 3);
        assert_eq!(config.response_profile, ResponseProfile::Detailed);
    }
}
