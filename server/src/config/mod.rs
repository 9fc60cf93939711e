use std::env;
use std::net::SocketAddr;

use gatepass_core::SharedSecret;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/gatepass";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings for the HTTP middleware stack.
#[derive(Debug, Clone, Default)]
pub struct HttpSettings {
    /// Comma-separated origins; `None` falls back to the local dev origins.
    pub allowed_origins: Option<String>,
    pub production: bool,
}

#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub app_key: SharedSecret,
    pub http: HttpSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_key = lookup("APP_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("APP_KEY"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_value("DATABASE_MAX_CONNECTIONS", raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let bind_addr = parse_value(
            "BIND_ADDR",
            lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;

        let production = lookup("RUST_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections,
            bind_addr,
            app_key: SharedSecret::from(app_key),
            http: HttpSettings {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
                production,
            },
        })
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}
