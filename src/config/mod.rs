//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Where the health client looks when `API_BASE_URL` is unset
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Base URL the health client queries, without trailing slash
    pub api_base_url: String,
    /// Allowed browser origins for CORS (comma-separated)
    pub client_origin: String,

    /// Defense seed for requests and sessions that do not pick one
    pub defense_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match get("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
        };

        let defense_seed = match get("DEFENSE_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("DEFENSE_SEED"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            api_base_url: normalize_base_url(
                get("API_BASE_URL").as_deref().unwrap_or(DEFAULT_API_BASE_URL),
            ),
            client_origin: get("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),

            defense_seed,
        })
    }

    /// Parsed CORS origins
    pub fn client_origins(&self) -> impl Iterator<Item = &str> {
        self.client_origin
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Strip a trailing slash so paths can be appended with `/`
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let url = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if url.is_empty() {
        DEFAULT_API_BASE_URL.to_string()
    } else {
        url.to_string()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = tokio_test::assert_ok!(load(&[]));
        assert_eq!(config.server_addr.port(), 8000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.defense_seed, None);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9100"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9100);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = load(&[("API_BASE_URL", "http://api.example.test/")]).unwrap();
        assert_eq!(config.api_base_url, "http://api.example.test");
    }

    #[test]
    fn bad_values_are_rejected() {
        tokio_test::assert_err!(load(&[("PORT", "eighty")]));
        assert!(matches!(
            load(&[("SERVER_ADDR", "not-an-address")]),
            Err(ConfigError::InvalidAddress)
        ));
        assert!(matches!(
            load(&[("DEFENSE_SEED", "abc")]),
            Err(ConfigError::Invalid("DEFENSE_SEED"))
        ));
        assert_eq!(load(&[("DEFENSE_SEED", "42")]).unwrap().defense_seed, Some(42));
    }

    #[test]
    fn origins_split_on_commas() {
        let config = load(&[("CLIENT_ORIGIN", "http://a.test, http://b.test,")]).unwrap();
        let origins: Vec<_> = config.client_origins().collect();
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
