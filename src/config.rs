use std::fmt;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::errors::InventoryError;

/// Defaults for the optional settings.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TAG_FILTER: &str = "%TEAMNAME";
pub const DEFAULT_TAG_PREFIX: &str = "TEAMNAME-";
pub const DEFAULT_JOB_NAME: &str = "generic-prometheus-job-name";
pub const DEFAULT_FALLBACK_JOB_NAME: &str = "generic-metrics";
pub const DEFAULT_SERVER_DESCRIPTION: &str = "Server in my org";

/// Settings that drive how database rows become inventory hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierSettings {
    /// ILIKE pattern a tag value must match for the host to be selected.
    pub tag_filter: String,
    /// Prefix of the tag that carries the application region.
    pub tag_prefix: String,
    /// Prometheus job for hosts sorted into an environment.
    pub job_name: String,
    /// Prometheus job for hosts that could not be sorted.
    pub fallback_job_name: String,
    pub server_description: String,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            tag_filter: DEFAULT_TAG_FILTER.to_string(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            fallback_job_name: DEFAULT_FALLBACK_JOB_NAME.to_string(),
            server_description: DEFAULT_SERVER_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub db_name: String,
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub connect_timeout: Duration,
    pub ssl_mode: PgSslMode,
    pub classifier: ClassifierSettings,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("db_name", &self.db_name)
            .field("db_username", &self.db_username)
            .field("db_password", &"<redacted>")
            .field("db_hostname", &self.db_hostname)
            .field("db_port", &self.db_port)
            .field("connect_timeout", &self.connect_timeout)
            .field("ssl_mode", &self.ssl_mode)
            .field("classifier", &self.classifier)
            .finish()
    }
}

fn config_error(msg: impl Into<String>) -> InventoryError {
    InventoryError::Configuration(msg.into())
}

/// Reads a required, non-blank variable.
fn required<F>(lookup: &F, key: &str) -> Result<String, InventoryError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .ok_or_else(|| config_error(format!("{} environment variable required", key)))
        .and_then(|value| {
            if value.trim().is_empty() {
                return Err(config_error(format!("{} cannot be empty", key)));
            }
            Ok(value)
        })
}

/// Reads an optional variable, treating blank as unset.
fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Loads configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, InventoryError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InventoryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            db_name: required(&lookup, "DB_NAME")?,
            db_username: required(&lookup, "DB_USERNAME")?,
            db_password: required(&lookup, "DB_PASSWORD")?,
            db_hostname: required(&lookup, "DB_HOSTNAME")?,
            db_port: required(&lookup, "DB_PORT")?
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| config_error("DB_PORT must be a valid number between 1-65535"))?,
            connect_timeout: match optional(&lookup, "DB_CONNECT_TIMEOUT_SECS") {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        config_error("DB_CONNECT_TIMEOUT_SECS must be a positive number of seconds")
                    })?,
                None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            ssl_mode: match optional(&lookup, "DB_SSLMODE") {
                Some(raw) => raw.trim().parse::<PgSslMode>().map_err(|_| {
                    config_error(
                        "DB_SSLMODE must be one of disable, allow, prefer, require, verify-ca, verify-full",
                    )
                })?,
                None => PgSslMode::Prefer,
            },
            classifier: ClassifierSettings {
                tag_filter: optional(&lookup, "INVENTORY_TAG_FILTER")
                    .unwrap_or_else(|| DEFAULT_TAG_FILTER.to_string()),
                tag_prefix: optional(&lookup, "INVENTORY_TAG_PREFIX")
                    .unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_string()),
                job_name: optional(&lookup, "INVENTORY_JOB_NAME")
                    .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string()),
                fallback_job_name: optional(&lookup, "INVENTORY_FALLBACK_JOB_NAME")
                    .unwrap_or_else(|| DEFAULT_FALLBACK_JOB_NAME.to_string()),
                server_description: optional(&lookup, "INVENTORY_SERVER_DESCRIPTION")
                    .unwrap_or_else(|| DEFAULT_SERVER_DESCRIPTION.to_string()),
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!(
            "Database target: {}@{}:{}/{}",
            config.db_username,
            config.db_hostname,
            config.db_port,
            config.db_name
        );
        tracing::debug!("Tag filter: {}", config.classifier.tag_filter);

        Ok(config)
    }

    /// Connection options for a single PostgreSQL session.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_hostname)
            .port(self.db_port)
            .username(&self.db_username)
            .password(&self.db_password)
            .database(&self.db_name)
            .ssl_mode(self.ssl_mode)
            .application_name("awx-pg-inventory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DB_NAME", "inventory"),
            ("DB_USERNAME", "awx"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_HOSTNAME", "db.internal"),
            ("DB_PORT", "5432"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, InventoryError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.db_port, 5432);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(matches!(config.ssl_mode, PgSslMode::Prefer));
        assert_eq!(config.classifier, ClassifierSettings::default());
    }

    #[test]
    fn test_each_required_variable_missing() {
        for key in ["DB_NAME", "DB_USERNAME", "DB_PASSWORD", "DB_HOSTNAME", "DB_PORT"] {
            let mut env = base_env();
            env.remove(key);
            let err = load(&env).unwrap_err();
            assert!(err.is_configuration(), "{} should be required", key);
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_blank_value_rejected() {
        let mut env = base_env();
        env.insert("DB_HOSTNAME", "   ");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("DB_HOSTNAME cannot be empty"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        for port in ["abc", "0", "70000", "-1"] {
            let mut env = base_env();
            env.insert("DB_PORT", port);
            assert!(load(&env).unwrap_err().is_configuration(), "port {}", port);
        }
    }

    #[test]
    fn test_optional_overrides() {
        let mut env = base_env();
        env.insert("DB_CONNECT_TIMEOUT_SECS", "3");
        env.insert("DB_SSLMODE", "require");
        env.insert("INVENTORY_TAG_PREFIX", "OPS-");
        env.insert("INVENTORY_JOB_NAME", "node");

        let config = load(&env).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(matches!(config.ssl_mode, PgSslMode::Require));
        assert_eq!(config.classifier.tag_prefix, "OPS-");
        assert_eq!(config.classifier.job_name, "node");
        assert_eq!(config.classifier.tag_filter, DEFAULT_TAG_FILTER);
    }

    #[test]
    fn test_invalid_optional_values_rejected() {
        let mut env = base_env();
        env.insert("DB_CONNECT_TIMEOUT_SECS", "0");
        assert!(load(&env).unwrap_err().is_configuration());

        let mut env = base_env();
        env.insert("DB_SSLMODE", "sometimes");
        assert!(load(&env).unwrap_err().is_configuration());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
