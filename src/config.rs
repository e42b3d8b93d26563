//! Service configuration, read from the environment after `.env` is loaded

use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database_url,
            port: parse_or("PORT", &lookup, DEFAULT_PORT)?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", &lookup, DEFAULT_MAX_CONNECTIONS)?,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], self.port)) }
}

fn parse_or<T: std::str::FromStr>(var: &'static str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(env(&[("DATABASE_URL", "postgres://localhost/catalog")])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8083");
    }

    #[test]
    fn test_missing_database_url() {
        assert_eq!(AppConfig::from_lookup(env(&[])).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(env(&[("DATABASE_URL", "x"), ("PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "PORT", value: "eighty".into() });
    }
}
