//! Configuration management for the Shipwright deployment service.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use shipwright_delivery::ChannelConfig;
use shipwright_pipeline::PipelineConfig;

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Credentials have no defaults. The server starts without them, but the
/// deploy endpoint refuses requests until they are supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Authentication
    /// Shared secret deployment webhooks must present.
    ///
    /// Environment variable: `SHARED_SECRET`
    #[serde(default, alias = "SHARED_SECRET")]
    pub shared_secret: Option<String>,

    // Hosting
    /// GitHub personal access token.
    ///
    /// Environment variable: `GITHUB_AUTH_TOKEN`
    #[serde(default, alias = "GITHUB_AUTH_TOKEN")]
    pub github_token: Option<String>,
    /// GitHub account that owns the deployment repositories.
    ///
    /// Environment variable: `GITHUB_USERNAME`
    #[serde(default, alias = "GITHUB_USERNAME")]
    pub github_owner: Option<String>,

    // Code generation
    /// API key for the generation gateway.
    ///
    /// Environment variable: `AIPIPE_API_KEY`
    #[serde(default, alias = "AIPIPE_API_KEY")]
    pub aipipe_api_key: Option<String>,
    /// Chat-completions endpoint of the generation gateway.
    ///
    /// Environment variable: `AIPIPE_API_URL`
    #[serde(default = "default_aipipe_api_url", alias = "AIPIPE_API_URL")]
    pub aipipe_api_url: String,

    // Notification
    /// HTTP timeout for evaluation notifications in seconds.
    ///
    /// Environment variable: `NOTIFY_TIMEOUT`
    #[serde(default = "default_notify_timeout", alias = "NOTIFY_TIMEOUT")]
    pub notify_timeout: u64,
    /// Attempt budget for evaluation notifications.
    ///
    /// Environment variable: `NOTIFY_MAX_ATTEMPTS`
    #[serde(default = "default_notify_max_attempts", alias = "NOTIFY_MAX_ATTEMPTS")]
    pub notify_max_attempts: u32,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Converts to the pipeline's configuration.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            channel: ChannelConfig {
                timeout: Duration::from_secs(self.notify_timeout),
                ..ChannelConfig::default()
            },
            max_notify_attempts: self.notify_max_attempts,
        }
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.notify_timeout == 0 {
            anyhow::bail!("notify_timeout must be greater than 0");
        }

        if self.notify_max_attempts == 0 {
            anyhow::bail!("notify_max_attempts must be greater than 0");
        }

        if matches!(&self.shared_secret, Some(s) if s.is_empty()) {
            anyhow::bail!("shared_secret must not be empty when set");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            shared_secret: None,
            github_token: None,
            github_owner: None,
            aipipe_api_key: None,
            aipipe_api_url: default_aipipe_api_url(),
            notify_timeout: default_notify_timeout(),
            notify_max_attempts: default_notify_max_attempts(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_aipipe_api_url() -> String {
    shipwright_services::codegen::DEFAULT_API_URL.to_string()
}

fn default_notify_timeout() -> u64 {
    30
}

fn default_notify_max_attempts() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8000);
        assert_eq!(config.notify_max_attempts, 5);
        assert!(config.shared_secret.is_none());
    }

    #[test]
    fn rejects_zero_port() {
        let config = Config { port: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_shared_secret() {
        let config = Config { shared_secret: Some(String::new()), ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pipeline_config_carries_notify_tuning() {
        let config = Config { notify_timeout: 10, notify_max_attempts: 3, ..Config::default() };
        let pipeline = config.to_pipeline_config();
        assert_eq!(pipeline.channel.timeout, Duration::from_secs(10));
        assert_eq!(pipeline.max_notify_attempts, 3);
    }

    #[test]
    fn parses_server_addr() {
        let config = Config { host: "127.0.0.1".into(), port: 9000, ..Config::default() };
        assert_eq!(config.parse_server_addr().unwrap().to_string(), "127.0.0.1:9000");
    }
}
