use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::auth::signature::SigningConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). A dispatch run must
    /// finish inside it.
    pub request_timeout_secs: u64,
    /// Timezone the dispatch window and school days are evaluated in.
    pub timezone: Tz,
    /// Dispatch run tuning.
    pub dispatch: DispatchConfig,
    /// Trigger signature keys and URL hints.
    pub signing: SigningConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                       |
    /// | `APP_TIMEZONE`         | `Europe/Berlin`            |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", "3000");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", "60");
        let timezone: Tz = parse_env("APP_TIMEZONE", DEFAULT_TIMEZONE);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            timezone,
            dispatch: DispatchConfig::from_env(),
            signing: SigningConfig::from_env(),
        }
    }
}

/// Timezone used when `APP_TIMEZONE` is unset.
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// Notification title prefix used when `PUSH_APP_NAME` is unset.
pub const DEFAULT_APP_NAME: &str = "FDS Stundenplan";

/// Tuning for dispatch runs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of users processed at the same time.
    pub concurrency: usize,
    /// Upper bound for a single push delivery.
    pub delivery_timeout_secs: u64,
    /// Total attempts per device, including the inline one.
    pub retry_max_attempts: u32,
    /// Send title/body/url/tag with each push instead of an empty tickle.
    pub include_payload: bool,
    /// Prefix of every notification title.
    pub app_name: String,
    /// Upper bound for one upstream provider fetch.
    pub provider_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            delivery_timeout_secs: 10,
            retry_max_attempts: 3,
            include_payload: false,
            app_name: DEFAULT_APP_NAME.to_string(),
            provider_timeout_secs: 15,
        }
    }
}

impl DispatchConfig {
    /// Load dispatch tuning from environment variables.
    ///
    /// | Env Var                      | Default           |
    /// |------------------------------|-------------------|
    /// | `DISPATCH_CONCURRENCY`       | `8`               |
    /// | `PUSH_DELIVERY_TIMEOUT_SECS` | `10`              |
    /// | `PUSH_RETRY_MAX_ATTEMPTS`    | `3`               |
    /// | `PUSH_INCLUDE_PAYLOAD`       | `false`           |
    /// | `PUSH_APP_NAME`              | `FDS Stundenplan` |
    /// | `PROVIDER_TIMEOUT_SECS`      | `15`              |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency: usize = parse_env("DISPATCH_CONCURRENCY", "8");
        let app_name = std::env::var("PUSH_APP_NAME")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.app_name);

        Self {
            concurrency: concurrency.max(1),
            delivery_timeout_secs: parse_env("PUSH_DELIVERY_TIMEOUT_SECS", "10"),
            retry_max_attempts: parse_env::<u32>("PUSH_RETRY_MAX_ATTEMPTS", "3").max(1),
            include_payload: std::env::var("PUSH_INCLUDE_PAYLOAD")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            app_name,
            provider_timeout_secs: parse_env("PROVIDER_TIMEOUT_SECS", "15"),
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Boolean flag parsing shared by env vars and query parameters.
///
/// `1`, `true`, `yes` and `on` (any case) are true; everything else is false.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_env<T>(key: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["", "0", "false", "no", "off", "2", "y"] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn default_timezone_parses() {
        let tz: Tz = DEFAULT_TIMEZONE.parse().unwrap();
        assert_eq!(tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.retry_max_attempts, 3);
        assert!(!config.include_payload);
        assert_eq!(config.delivery_timeout(), Duration::from_secs(10));
        assert_eq!(config.app_name, "FDS Stundenplan");
    }
}
