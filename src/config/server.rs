use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DB_FILE: &str = "./data.db";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the SQLite database file. Created on first start.
    pub db_file: PathBuf,
}

impl ServerConfig {
    /// Builds a config from `DB_FILE` and `PORT`, falling back to the defaults
    /// for whichever is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(db_file) = lookup("DB_FILE").filter(|v| !v.is_empty()) {
            config.db_file = PathBuf::from(db_file);
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got '{port}'")))?;
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            db_file: PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_empty() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.db_file, PathBuf::from("./data.db"));
        assert_eq!(config.socket_addr().unwrap().port(), 4000);
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(|key| match key {
            "DB_FILE" => Some("/tmp/inventory.db".to_string()),
            "PORT" => Some("5050".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.port, 5050);
        assert_eq!(config.db_file, PathBuf::from("/tmp/inventory.db"));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = ServerConfig::from_lookup(|key| (key == "PORT").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
