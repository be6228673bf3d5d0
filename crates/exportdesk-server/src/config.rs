//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use exportdesk_core::CoreConfig;
use exportdesk_shared::constants::DEFAULT_NOTIFY_CAPACITY;

/// Which [`exportdesk_store::Store`] implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Env: `STORE_BACKEND` (`sqlite` | `memory`)
    /// Default: `sqlite`
    pub store_backend: StoreBackend,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `exportdesk.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// JSON snapshot written by the memory backend after every write.
    /// Env: `SNAPSHOT_PATH`
    /// Default: none (memory backend forgets everything on exit).
    pub snapshot_path: Option<PathBuf>,

    /// Buffered insert notifications per store before slow thread streams
    /// fall back to refetching.
    /// Env: `NOTIFY_CAPACITY`
    /// Default: `256`
    pub notify_capacity: usize,

    /// MOQ and status-transition rules.
    /// Env: `EXPORTDESK_MOQ_POLICY`, `EXPORTDESK_TRANSITION_POLICY`
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            store_backend: StoreBackend::default(),
            database_path: None,
            snapshot_path: None,
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(backend) = lookup("STORE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => config.store_backend = parsed,
                Err(e) => tracing::warn!(error = %e, "Invalid STORE_BACKEND, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("SNAPSHOT_PATH").filter(|p| !p.is_empty()) {
            config.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("NOTIFY_CAPACITY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.notify_capacity = n,
                _ => tracing::warn!(value = %val, "Invalid NOTIFY_CAPACITY, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config.core = CoreConfig::from_lookup(&lookup);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exportdesk_core::MoqPolicy;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.notify_capacity, 256);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("STORE_BACKEND", "Memory"),
            ("SNAPSHOT_PATH", "/var/lib/exportdesk/state.json"),
            ("NOTIFY_CAPACITY", "32"),
            ("EXPORTDESK_MOQ_POLICY", "advisory"),
        ]));
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/var/lib/exportdesk/state.json"))
        );
        assert_eq!(config.notify_capacity, 32);
        assert_eq!(config.core.moq_policy, MoqPolicy::Advisory);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("STORE_BACKEND", "postgres"),
            ("NOTIFY_CAPACITY", "0"),
        ]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.notify_capacity, 256);
    }
}
