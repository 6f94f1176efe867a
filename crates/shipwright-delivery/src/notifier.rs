//! Best-effort notification delivery loop.

use std::sync::Arc;

use serde::Serialize;
use shipwright_core::{Clock, RealClock};
use tracing::{info, warn};

use crate::backoff::BackoffSchedule;
use crate::channel::{ChannelConfig, NotificationChannel};
use crate::error::DeliveryError;

/// Longest response body fragment carried into logs.
const BODY_SNIPPET_LEN: usize = 200;

/// Result of a delivery run.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// Whether any attempt received a 200 OK.
    pub delivered: bool,
    /// Number of attempts made.
    pub attempts: u32,
    /// Description of the last failure when delivery did not succeed.
    pub detail: Option<String>,
}

/// Delivers JSON payloads with bounded retries.
///
/// Success is exactly HTTP 200; redirects followed to a non-200 terminus,
/// other 2xx codes, and every error all count as failed attempts. Waits
/// between attempts come from the backoff schedule through the injected
/// clock.
#[derive(Debug, Clone)]
pub struct Notifier {
    channel: NotificationChannel,
    backoff: BackoffSchedule,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    /// Creates a notifier over an open channel with the default schedule.
    pub fn new(channel: NotificationChannel) -> Self {
        Self::with_clock(channel, Arc::new(RealClock::new()))
    }

    /// Creates a notifier with an injected clock, used by tests.
    pub fn with_clock(channel: NotificationChannel, clock: Arc<dyn Clock>) -> Self {
        Self { channel, backoff: BackoffSchedule::default(), clock }
    }

    /// Replaces the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// POSTs `payload` to `url`, retrying until success or the attempt
    /// budget is spent. Never returns an error: the outcome records what
    /// happened.
    pub async fn deliver<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
        max_attempts: u32,
    ) -> DeliveryOutcome {
        let mut last_error: Option<DeliveryError> = None;

        for attempt in 0..max_attempts {
            match self.attempt(url, payload).await {
                Ok(()) => {
                    info!(url, attempt = attempt + 1, "notification delivered");
                    return DeliveryOutcome {
                        delivered: true,
                        attempts: attempt + 1,
                        detail: None,
                    };
                }
                Err(e) => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "notification attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt + 1 < max_attempts {
                self.clock.sleep(self.backoff.delay(attempt)).await;
            }
        }

        warn!(url, max_attempts, "notification delivery exhausted all attempts");
        DeliveryOutcome {
            delivered: false,
            attempts: max_attempts,
            detail: last_error.map(|e| e.to_string()),
        }
    }

    async fn attempt<T: Serialize>(&self, url: &str, payload: &T) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| DeliveryError::serialization(e.to_string()))?;

        let response = self
            .channel
            .client()
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        // Walk back to a char boundary; truncating mid-codepoint panics.
        let mut cut = BODY_SNIPPET_LEN.min(body.len());
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        Err(DeliveryError::HttpStatus { status: status.as_u16(), body })
    }

    fn classify(&self, error: reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            DeliveryError::Timeout {
                timeout_seconds: self.channel.config().timeout.as_secs(),
            }
        } else if error.is_connect() {
            DeliveryError::network(error.to_string())
        } else {
            DeliveryError::transport(error.to_string())
        }
    }
}

/// Synchronous wrapper for callers without a runtime.
///
/// Builds a single-threaded runtime for the duration of one delivery.
/// Callers already inside a tokio runtime must use [`Notifier::deliver`].
pub fn deliver_blocking<T: Serialize>(
    url: &str,
    payload: &T,
    max_attempts: u32,
    config: ChannelConfig,
) -> Result<DeliveryOutcome, DeliveryError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DeliveryError::configuration(e.to_string()))?;
    let channel = NotificationChannel::open(config)?;
    let notifier = Notifier::new(channel);
    Ok(runtime.block_on(notifier.deliver(url, payload, max_attempts)))
}
