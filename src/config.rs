//! Process configuration.
//!
//! Read once from the environment at startup and passed explicitly to
//! the prompt builder and HTTP layer:
//! - `HOST` - bind address (default `0.0.0.0`)
//! - `PORT` - listen port (default `3000`)
//! - `WORKING_DIR` - directory reported in the system prompt (default: cwd at startup)
//! - `ANTHROPIC_API_URL` - Anthropic base URL
//! - `MAX_OUTPUT_TOKENS` - `max_tokens` sent to the provider (default `4096`)
//! - `MAX_BODY_BYTES` - request body limit (default 25 MiB)
//!
//! Provider credentials are never read from the environment; they travel in
//! each request body.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::llm::AnthropicSettings;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub working_dir: PathBuf,
    pub anthropic: AnthropicSettings,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            working_dir: PathBuf::from("."),
            anthropic: AnthropicSettings::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let working_dir = match lookup("WORKING_DIR").filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };

        let anthropic = AnthropicSettings {
            base_url: lookup("ANTHROPIC_API_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.anthropic.base_url),
            max_tokens: parse_var(&lookup, "MAX_OUTPUT_TOKENS", defaults.anthropic.max_tokens)?,
        };

        Ok(Self {
            host: lookup("HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            working_dir,
            anthropic,
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("WORKING_DIR", "/srv")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.working_dir, PathBuf::from("/srv"));
        assert_eq!(config.anthropic.max_tokens, 4096);
        assert_eq!(config.anthropic.base_url, "https://api.anthropic.com");
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("MAX_OUTPUT_TOKENS", "1024"),
            ("ANTHROPIC_API_URL", "http://localhost:9999"),
            ("MAX_BODY_BYTES", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.anthropic.max_tokens, 1024);
        assert_eq!(config.anthropic.base_url, "http://localhost:9999");
        assert_eq!(config.max_body_bytes, 1000);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));
    }
}
