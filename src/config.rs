use std::{env, net::SocketAddr};

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://java-api-consumer.onrender.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub bind_addr: String,
    pub port: u16,
    pub mcp_path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_BASE must be an absolute http(s) URL")]
    InvalidApiBase,
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_PATH must be a literal path starting with '/' that does not shadow '/' or '/ping'")]
    InvalidMcpPath,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("API_BASE")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let parsed_base = Url::parse(&api_base).map_err(|_| ConfigError::InvalidApiBase)?;
        if !matches!(parsed_base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiBase);
        }

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .map(|value| value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8000);

        let mcp_path = lookup("MCP_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "/mcp".to_string());
        if !is_static_route(&mcp_path) || mcp_path == "/" || mcp_path == "/ping" {
            return Err(ConfigError::InvalidMcpPath);
        }

        let config = Self {
            api_base,
            bind_addr,
            port,
            mcp_path,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

/// Router paths must be literal: no `:param`/`*wildcard` segments and no `{}` captures.
fn is_static_route(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}'])
        && path
            .split('/')
            .all(|segment| !segment.starts_with(':') && !segment.starts_with('*'))
}
