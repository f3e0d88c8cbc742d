//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Model used when a command does not name one
    pub default_model: Option<String>,

    /// Optional per-endpoint rate limiting
    pub rate_limit: Option<RateLimitConfig>,
}

/// Token-bucket settings for [`crate::limit::RateLimiter`]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,

    #[serde(default = "default_burst")]
    pub burst: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            default_model: None,
            rate_limit: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file with environment variable overrides
    ///
    /// Without an explicit path, `<config dir>/ollamactl/config.toml` is
    /// used when it exists, else defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.base_url = host;
        }
        if let Ok(timeout) = std::env::var("OLLAMACTL_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout
                .parse()
                .context("Invalid OLLAMACTL_TIMEOUT_SECS value")?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!(
                "base_url must start with http:// or https:// (got {})",
                self.base_url
            );
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }

        if let Some(limit) = &self.rate_limit {
            if limit.requests_per_second <= 0.0 {
                anyhow::bail!(
                    "rate_limit.requests_per_second must be > 0 (got {})",
                    limit.requests_per_second
                );
            }
            if limit.burst < 1.0 {
                anyhow::bail!("rate_limit.burst must be >= 1 (got {})", limit.burst);
            }
        }

        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ollamactl").join("config.toml"))
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_burst() -> f64 {
    10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.rate_limit.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_parsing_with_partial_fields() {
        let config: ClientConfig = toml::from_str(
            r#"
            base_url = "http://gpu-box:11434"
            default_model = "llama3:8b"

            [rate_limit]
            requests_per_second = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.default_model.as_deref(), Some("llama3:8b"));
        assert_eq!(config.request_timeout_secs, 60);
        let limit = config.rate_limit.unwrap();
        assert_eq!(limit.requests_per_second, 5.0);
        assert_eq!(limit.burst, 10.0);
    }

    #[test]
    fn test_scheme_validation() {
        let config = ClientConfig {
            base_url: "localhost:11434".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_limit_validation() {
        let config = ClientConfig {
            rate_limit: Some(RateLimitConfig {
                requests_per_second: 0.0,
                burst: 10.0,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trailing_slash_normalization() {
        let config = ClientConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.normalized_base_url(), "http://localhost:11434");
    }
}
