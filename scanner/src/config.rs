use std::env;
use std::path::PathBuf;
use std::time::Duration;

use gatepass_core::offline::SNAPSHOT_TTL_SECS;
use reqwest::Url;

use crate::error::{Result, ScannerError};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_PATH: &str = "gatepass-scanner.db";

/// Settings for one scanning device.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub base_url: Url,
    /// User id sent as the actor of every request.
    pub actor_id: i64,
    pub timeout: Duration,
    pub snapshot_ttl: chrono::Duration,
    pub db_path: PathBuf,
}

impl ScannerConfig {
    pub fn new(base_url: Url, actor_id: i64) -> Self {
        Self {
            base_url,
            actor_id,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            snapshot_ttl: chrono::Duration::seconds(SNAPSHOT_TTL_SECS),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }

    /// Reads `GATEPASS_URL`, `GATEPASS_ACTOR_ID`, `GATEPASS_TIMEOUT_SECS` and
    /// `GATEPASS_DB_PATH`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("GATEPASS_URL")
            .ok_or_else(|| ScannerError::Config("GATEPASS_URL must be set".to_string()))?;
        let base_url = Url::parse(raw_url.trim())
            .map_err(|e| ScannerError::Config(format!("GATEPASS_URL: {e}")))?;

        let actor_id = lookup("GATEPASS_ACTOR_ID")
            .ok_or_else(|| ScannerError::Config("GATEPASS_ACTOR_ID must be set".to_string()))?
            .trim()
            .parse()
            .map_err(|_| ScannerError::Config("GATEPASS_ACTOR_ID must be a user id".to_string()))?;

        let mut config = Self::new(base_url, actor_id);

        if let Some(raw) = lookup("GATEPASS_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ScannerError::Config(format!("GATEPASS_TIMEOUT_SECS: invalid value '{raw}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = lookup("GATEPASS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<ScannerConfig> {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        ScannerConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = from(&[
            ("GATEPASS_URL", "https://gate.example.com"),
            ("GATEPASS_ACTOR_ID", "7"),
        ])
        .unwrap();
        assert_eq!(config.actor_id, 7);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.snapshot_ttl, chrono::Duration::minutes(5));
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_overrides() {
        let config = from(&[
            ("GATEPASS_URL", "http://10.0.0.2:3001"),
            ("GATEPASS_ACTOR_ID", "7"),
            ("GATEPASS_TIMEOUT_SECS", "3"),
            ("GATEPASS_DB_PATH", "/var/lib/gate/scan.db"),
        ])
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.db_path, PathBuf::from("/var/lib/gate/scan.db"));
    }

    #[test]
    fn test_missing_and_invalid_values() {
        assert!(matches!(from(&[]), Err(ScannerError::Config(_))));
        assert!(matches!(
            from(&[("GATEPASS_URL", "not a url"), ("GATEPASS_ACTOR_ID", "7")]),
            Err(ScannerError::Config(_))
        ));
        assert!(matches!(
            from(&[
                ("GATEPASS_URL", "https://gate.example.com"),
                ("GATEPASS_ACTOR_ID", "7"),
                ("GATEPASS_TIMEOUT_SECS", "soon"),
            ]),
            Err(ScannerError::Config(_))
        ));
    }
}
