use anyhow::{anyhow, Context, Result};
use std::env;

use crate::credential::CredentialStrategy;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.thirdweb.com/ai/chat";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8080/api/chat";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub upstream_url: String,
    pub credentials: CredentialStrategy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("CHAT_BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup("CHAT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("CHAT_PORT is not a valid port: {}", raw))?,
            None => 8080,
        };

        let upstream_url =
            lookup("THIRDWEB_API_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());

        let mode = lookup("THIRDWEB_AUTH_MODE").unwrap_or_else(|| "secret-key".to_string());
        let credentials = match mode.trim() {
            "secret-key" => CredentialStrategy::SecretKey {
                secret_key: lookup("THIRDWEB_SECRET_KEY"),
            },
            "client-id" => CredentialStrategy::ClientId {
                client_id: lookup("THIRDWEB_CLIENT_ID"),
            },
            other => {
                return Err(anyhow!(
                    "Unknown THIRDWEB_AUTH_MODE '{}', expected 'secret-key' or 'client-id'",
                    other
                ))
            }
        };

        Ok(Self {
            bind_addr,
            port,
            upstream_url,
            credentials,
        })
    }
}

/// Proxy endpoint the terminal client talks to.
pub fn proxy_url() -> String {
    env::var("CHAT_PROXY_URL").unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string())
}
