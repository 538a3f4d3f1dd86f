//! Configuration management for the Leadboard API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL
    pub redis_url: String,

    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Upper bound on a request body, multipart uploads included
    pub max_upload_bytes: usize,

    /// Page size used when a list request does not name one
    pub default_page_limit: u32,

    /// Largest page size a client may ask for
    pub max_page_limit: u32,

    /// Whether `/api` routes demand an admin session
    pub require_admin: bool,

    /// Rows returned for the dashboard's recent leads table
    pub recent_leads_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 8090,
            max_upload_bytes: 20 * 1024 * 1024,
            default_page_limit: 50,
            max_page_limit: 200,
            require_admin: true,
            recent_leads_limit: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),

            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| defaults.api_port.to_string())
                .parse()
                .context("Invalid API_PORT")?,

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| defaults.max_upload_bytes.to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES")?,

            default_page_limit: env::var("DEFAULT_PAGE_LIMIT")
                .unwrap_or_else(|_| defaults.default_page_limit.to_string())
                .parse()
                .context("Invalid DEFAULT_PAGE_LIMIT")?,

            max_page_limit: env::var("MAX_PAGE_LIMIT")
                .unwrap_or_else(|_| defaults.max_page_limit.to_string())
                .parse()
                .context("Invalid MAX_PAGE_LIMIT")?,

            require_admin: env::var("REQUIRE_ADMIN")
                .unwrap_or_else(|_| defaults.require_admin.to_string())
                .parse()
                .context("Invalid REQUIRE_ADMIN (expected true/false)")?,

            recent_leads_limit: env::var("RECENT_LEADS_LIMIT")
                .unwrap_or_else(|_| defaults.recent_leads_limit.to_string())
                .parse()
                .context("Invalid RECENT_LEADS_LIMIT")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than 0");
        }

        if self.default_page_limit == 0 || self.max_page_limit == 0 {
            anyhow::bail!("Page limits must be greater than 0");
        }

        if self.default_page_limit > self.max_page_limit {
            anyhow::bail!("DEFAULT_PAGE_LIMIT cannot exceed MAX_PAGE_LIMIT");
        }

        if self.recent_leads_limit == 0 {
            anyhow::bail!("RECENT_LEADS_LIMIT must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_address() {
        let config = Config {
            api_host: "127.0.0.1".to_string(),
            api_port: 9000,
            ..Config::default()
        };

        assert_eq!(config.api_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_page_limit, 50);
        assert!(config.require_admin);
        assert_eq!(config.recent_leads_limit, 5);
    }

    #[test]
    fn test_validate_zero_recent_leads() {
        let config = Config {
            recent_leads_limit: 0,
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_port() {
        let config = Config {
            api_port: 0,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("API_PORT must be greater than 0"));
    }

    #[test]
    fn test_validate_default_limit_above_max() {
        let config = Config {
            default_page_limit: 500,
            max_page_limit: 100,
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }
}
