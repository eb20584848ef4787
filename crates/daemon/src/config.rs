//! Daemon configuration
//!
//! Every setting comes from a `KVQUEUE_*` environment variable and has a default.

use kvqueue_api_rpc::RpcServerConfig;
use kvqueue_core::error::{AppError, Result};
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "~/.kvqueue/queues.db";

/// Log output style on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    /// Discard persisted state on startup
    pub ephemeral: bool,
    /// Fail startup on an undecodable queue record instead of skipping it
    pub strict_recovery: bool,
    pub rpc: RpcServerConfig,
    pub log_format: LogFormat,
    /// Directory for daily-rotated JSON log files
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("KVQUEUE_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let ephemeral = parse_flag("KVQUEUE_EPHEMERAL", lookup("KVQUEUE_EPHEMERAL"))?;
        let strict_recovery =
            parse_flag("KVQUEUE_STRICT_RECOVERY", lookup("KVQUEUE_STRICT_RECOVERY"))?;

        let mut rpc = RpcServerConfig::default();
        if let Some(host) = lookup("KVQUEUE_RPC_HOST") {
            rpc.host = host;
        }
        if let Some(port) = lookup("KVQUEUE_RPC_PORT") {
            rpc.port = port.trim().parse().map_err(|_| {
                AppError::Config(format!("KVQUEUE_RPC_PORT must be a port number, got {:?}", port))
            })?;
        }

        let log_format = match lookup("KVQUEUE_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "KVQUEUE_LOG_FORMAT must be \"pretty\" or \"json\", got {:?}",
                    other
                )))
            }
        };

        let log_dir = lookup("KVQUEUE_LOG_DIR")
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned()));

        Ok(Self {
            db_path,
            ephemeral,
            strict_recovery,
            rpc,
            log_format,
            log_dir,
        })
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(config.db_path.ends_with(".kvqueue/queues.db"));
        assert!(!config.db_path.starts_with('~'));
        assert!(!config.ephemeral);
        assert!(!config.strict_recovery);
        assert_eq!(config.rpc.host, "127.0.0.1");
        assert_eq!(config.rpc.port, 9999);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("KVQUEUE_DB_PATH", "/tmp/q.db"),
            ("KVQUEUE_EPHEMERAL", "true"),
            ("KVQUEUE_STRICT_RECOVERY", "1"),
            ("KVQUEUE_RPC_HOST", "0.0.0.0"),
            ("KVQUEUE_RPC_PORT", "0"),
            ("KVQUEUE_LOG_FORMAT", "json"),
            ("KVQUEUE_LOG_DIR", "/var/log/kvqueue"),
        ])
        .unwrap();

        assert_eq!(config.db_path, "/tmp/q.db");
        assert!(config.ephemeral);
        assert!(config.strict_recovery);
        assert_eq!(config.rpc.host, "0.0.0.0");
        assert_eq!(config.rpc.port, 0);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/kvqueue")));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("KVQUEUE_RPC_PORT", "99999")],
            [("KVQUEUE_EPHEMERAL", "maybe")],
            [("KVQUEUE_LOG_FORMAT", "xml")],
        ] {
            let err = config_from(&vars).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{:?}", vars);
        }
    }
}
