use std::env;

use crate::error::{Error, Result};

/// Runtime configuration for the GitHub REST gateway and the server.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_pages: u32,
    pub enable_ping: bool,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional; requests are anonymous without it]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_HTTP_MAX_RETRIES (default: 5)
    /// - GITHUB_USER_AGENT (default: github-explorer-mcp/<version>)
    /// - GITHUB_MCP_ENABLE_PING (default: off)
    /// - GITHUB_MCP_MAX_PAGES (default: 10)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("GITHUB_TOKEN")
            .or_else(|| lookup("GH_TOKEN"))
            .filter(|t| !t.trim().is_empty());

        let api_url = lookup("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_url)
            .map_err(|e| Error::Config(format!("GITHUB_API_URL {:?}: {}", api_url, e)))?;

        let api_version = lookup("GITHUB_API_VERSION").unwrap_or_else(|| "2022-11-28".to_string());
        let timeout_secs = parse_or(&lookup, "GITHUB_HTTP_TIMEOUT_SECS", 30u64);
        let max_retries = parse_or(&lookup, "GITHUB_HTTP_MAX_RETRIES", 5u32);
        let max_pages = parse_or(&lookup, "GITHUB_MCP_MAX_PAGES", 10u32).max(1);
        let user_agent = lookup("GITHUB_USER_AGENT")
            .unwrap_or_else(|| format!("github-explorer-mcp/{}", env!("CARGO_PKG_VERSION")));
        let enable_ping = lookup("GITHUB_MCP_ENABLE_PING")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
            max_retries,
            max_pages,
            enable_ping,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
