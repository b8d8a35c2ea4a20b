//! Daemon configuration from environment variables

use anyhow::{Context, Result};
use healthcheck_core::application::CoordinatorConfig;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.healthcheck/tasks.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub coordinator: CoordinatorConfig,
}

impl DaemonConfig {
    /// Read `HEALTHCHECK_*` variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("HEALTHCHECK_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let rpc_host =
            lookup("HEALTHCHECK_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());
        let rpc_port = match lookup("HEALTHCHECK_RPC_PORT") {
            Some(s) => s.parse().context("HEALTHCHECK_RPC_PORT must be a port number")?,
            None => DEFAULT_RPC_PORT,
        };

        let defaults = CoordinatorConfig::default();
        let coordinator = CoordinatorConfig {
            phase_timeout: millis(&lookup, "HEALTHCHECK_PHASE_TIMEOUT_MS")?
                .unwrap_or(defaults.phase_timeout),
            compensation_timeout: millis(&lookup, "HEALTHCHECK_COMPENSATION_TIMEOUT_MS")?
                .unwrap_or(defaults.compensation_timeout),
        };

        Ok(Self {
            db_path,
            rpc_host,
            rpc_port,
            coordinator,
        })
    }

    /// sqlx connection URL for `db_path`
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    lookup(key)
        .map(|s| {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("{} must be a whole number of milliseconds", key))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.rpc_host, "127.0.0.1");
        assert_eq!(config.rpc_port, 9630);
        assert_eq!(config.coordinator, CoordinatorConfig::default());
        assert!(config.db_path.ends_with(".healthcheck/tasks.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("HEALTHCHECK_DB_PATH", "sqlite::memory:"),
            ("HEALTHCHECK_RPC_PORT", "0"),
            ("HEALTHCHECK_PHASE_TIMEOUT_MS", "250"),
            ("HEALTHCHECK_COMPENSATION_TIMEOUT_MS", "100"),
        ])
        .unwrap();

        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.rpc_port, 0);
        assert_eq!(config.coordinator.phase_timeout, Duration::from_millis(250));
        assert_eq!(config.coordinator.compensation_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_file_path_becomes_url() {
        let config = config(&[("HEALTHCHECK_DB_PATH", "/tmp/tasks.db")]).unwrap();
        assert_eq!(config.database_url(), "sqlite:///tmp/tasks.db");
    }

    #[test]
    fn test_bad_numbers_are_rejected() {
        assert!(config(&[("HEALTHCHECK_RPC_PORT", "http")]).is_err());
        assert!(config(&[("HEALTHCHECK_PHASE_TIMEOUT_MS", "-1")]).is_err());
    }
}
