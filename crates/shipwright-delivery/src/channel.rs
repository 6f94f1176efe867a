//! HTTP channel used for outbound notifications.

use std::time::Duration;

use crate::error::DeliveryError;

/// User-Agent sent on every notification request.
pub const USER_AGENT: &str = concat!("shipwright-notifier/", env!("CARGO_PKG_VERSION"));

/// Tuning for the outbound notification channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Upper bound on concurrent connections the channel should use.
    pub max_connections: usize,
    /// Idle connections kept pooled per host.
    pub max_idle_connections: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
            max_connections: 10,
            max_idle_connections: 5,
        }
    }
}

/// Pooled HTTP client for notification delivery.
///
/// Opened once and shared across deliveries; the pool is released when the
/// channel is dropped. Only the idle-per-host cap is enforced at the client
/// level; `max_connections` is advisory for callers sizing their concurrency.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    client: reqwest::Client,
    config: ChannelConfig,
}

impl NotificationChannel {
    /// Opens a channel with the given configuration.
    pub fn open(config: ChannelConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()
            .map_err(|e| DeliveryError::configuration(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_service_tuning() {
        let config = ChannelConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_idle_connections, 5);
        assert!(config.user_agent.starts_with("shipwright-notifier/"));
    }

    #[test]
    fn channel_opens_with_defaults() {
        assert!(NotificationChannel::open(ChannelConfig::default()).is_ok());
    }
}
