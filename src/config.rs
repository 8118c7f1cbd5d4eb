//! Configuration management for the research service.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `TAVILY_API_KEY` - Required. Web search provider key.
//! - `EXA_API_KEY` - Required. Academic and X search provider key.
//! - `FIRECRAWL_API_KEY` - Optional. Page scraping key; `/api/retrieve` is
//!   unavailable without it.
//! - `PRIMARY_MODEL` - Optional. Fast model tried first. Defaults to `x-ai/grok-2-1212`.
//! - `FALLBACK_MODEL` - Optional. Reliable model used after the primary fails.
//!   Defaults to `anthropic/claude-3.5-sonnet`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `RESEARCH_TIMEOUT_SECS` - Optional. Upper bound on a single research run. Defaults to `300`.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PRIMARY_MODEL: &str = "x-ai/grok-2-1212";
pub const DEFAULT_FALLBACK_MODEL: &str = "anthropic/claude-3.5-sonnet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// The two generation profiles every LLM-backed stage can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfiles {
    /// Fast and cheap, higher failure rate
    pub primary: String,

    /// Slower and pricier, higher reliability
    pub fallback: String,
}

impl Default for ModelProfiles {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Tavily API key (web search)
    pub tavily_api_key: String,

    /// Exa API key (academic and X search)
    pub exa_api_key: String,

    /// Firecrawl API key (page retrieval)
    pub firecrawl_api_key: Option<String>,

    /// Model identifiers (OpenRouter format)
    pub models: ModelProfiles,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum wall-clock time for one research run
    pub research_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if any provider key is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required("OPENROUTER_API_KEY")?;
        let tavily_api_key = required("TAVILY_API_KEY")?;
        let exa_api_key = required("EXA_API_KEY")?;
        let firecrawl_api_key = optional("FIRECRAWL_API_KEY");

        let models = ModelProfiles {
            primary: std::env::var("PRIMARY_MODEL")
                .unwrap_or_else(|_| DEFAULT_PRIMARY_MODEL.to_string()),
            fallback: std::env::var("FALLBACK_MODEL")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_MODEL.to_string()),
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let timeout_secs: u64 = std::env::var("RESEARCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("RESEARCH_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            api_key,
            tavily_api_key,
            exa_api_key,
            firecrawl_api_key,
            models,
            host,
            port,
            research_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, tavily_api_key: String, exa_api_key: String) -> Self {
        Self {
            api_key,
            tavily_api_key,
            exa_api_key,
            firecrawl_api_key: None,
            models: ModelProfiles::default(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            research_timeout: Duration::from_secs(300),
        }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
