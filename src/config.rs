use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;

use crate::services::board_state::RefreshOrdering;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not a valid URL: {value}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("{key} must be {expected}, got {value:?}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("cannot parse listen address {0}")]
    InvalidListenAddr(String),
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub api_url: Url,
    /// Sent as `Host` when the upstream sits behind a host-routed ingress.
    pub api_host: Option<String>,
    pub api_timeout: Duration,
    pub notice_duration: Duration,
    pub refresh_ordering: RefreshOrdering,
    pub host: String,
    pub port: u16,
}

impl BoardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("BOARD_API_URL").unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
        let api_url = Url::parse(&raw_url).map_err(|_| ConfigError::InvalidUrl {
            key: "BOARD_API_URL",
            value: raw_url.clone(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                key: "BOARD_API_URL",
                value: raw_url,
            });
        }

        let api_host = lookup("BOARD_API_HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let api_timeout = Duration::from_secs(parse_secs(&lookup, "BOARD_API_TIMEOUT_SECS", 10)?);
        let notice_duration = Duration::from_secs(parse_secs(&lookup, "BOARD_NOTICE_SECS", 5)?);

        let refresh_ordering = match lookup("BOARD_REFRESH_ORDERING").as_deref().map(str::trim) {
            None | Some("") | Some("completion") => RefreshOrdering::Completion,
            Some("issue") => RefreshOrdering::Issue,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BOARD_REFRESH_ORDERING",
                    expected: "`completion` or `issue`",
                    value: other.to_string(),
                })
            }
        };

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(3000);

        Ok(Self {
            api_url,
            api_host,
            api_timeout,
            notice_duration,
            refresh_ordering,
            host,
            port,
        })
    }

    pub fn listen_addr(&self, port: u16) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, port);
        raw.parse().map_err(|_| ConfigError::InvalidListenAddr(raw))
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            expected: "a whole number of seconds",
            value: v,
        }),
    }
}
