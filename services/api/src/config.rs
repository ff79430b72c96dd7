use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db::DbConfig;
use crate::service::{ServiceConfig, DEFAULT_OP_TIMEOUT};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    pub run_migrations: bool,
    pub service: ServiceConfig,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = get("PRR_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("PRR_LISTEN_ADDR")?;

        let log_level = get("PRR_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match get("PRR_LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => anyhow::bail!("PRR_LOG_FORMAT must be json or pretty, got {other}"),
        };

        let run_migrations = get("PRR_RUN_MIGRATIONS")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let mut service = ServiceConfig::default();
        if let Some(raw) = get("PRR_MAX_REVIEWERS") {
            service.max_reviewers = raw.parse().context("PRR_MAX_REVIEWERS")?;
        }
        service.op_timeout = match get("PRR_OP_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.parse().context("PRR_OP_TIMEOUT_MS")?),
            None => DEFAULT_OP_TIMEOUT,
        };

        let mut database = DbConfig::default();
        if let Some(url) = get("DATABASE_URL") {
            database.database_url = url;
        }
        if let Some(raw) = get("DB_MAX_CONNECTIONS") {
            database.max_connections = raw.parse().context("DB_MAX_CONNECTIONS")?;
        }
        if let Some(raw) = get("DB_MIN_CONNECTIONS") {
            database.min_connections = raw.parse().context("DB_MIN_CONNECTIONS")?;
        }

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            run_migrations,
            service,
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::db::DEFAULT_DATABASE_URL;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.run_migrations);
        assert_eq!(config.service.max_reviewers, 2);
        assert_eq!(config.service.op_timeout, Duration::from_secs(5));
        assert_eq!(config.database.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PRR_LISTEN_ADDR", "127.0.0.1:9000"),
            ("PRR_LOG_FORMAT", "pretty"),
            ("PRR_RUN_MIGRATIONS", "TRUE"),
            ("PRR_MAX_REVIEWERS", "3"),
            ("PRR_OP_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.run_migrations);
        assert_eq!(config.service.max_reviewers, 3);
        assert_eq!(config.service.op_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_database_settings_come_from_lookup() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://app@db:5432/reviews"),
            ("DB_MAX_CONNECTIONS", "32"),
            ("DB_MIN_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(config.database.database_url, "postgres://app@db:5432/reviews");
        assert_eq!(config.database.max_connections, 32);
        assert_eq!(config.database.min_connections, 4);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_from(&[("PRR_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("PRR_LOG_FORMAT", "xml")]).is_err());
        assert!(config_from(&[("PRR_MAX_REVIEWERS", "-1")]).is_err());
        assert!(config_from(&[("DB_MAX_CONNECTIONS", "lots")]).is_err());
        assert!(config_from(&[("DB_MIN_CONNECTIONS", "-2")]).is_err());
    }
}
