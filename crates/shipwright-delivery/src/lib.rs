//! Notification delivery with bounded retries.
//!
//! The [`Notifier`] POSTs a JSON payload to a destination URL and retries on
//! any non-success outcome with a fixed backoff schedule. Delivery is
//! best-effort: after the attempt budget is spent the outcome records the
//! failure instead of propagating it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod channel;
pub mod error;
pub mod notifier;

pub use backoff::BackoffSchedule;
pub use channel::{ChannelConfig, NotificationChannel};
pub use error::DeliveryError;
pub use notifier::{deliver_blocking, DeliveryOutcome, Notifier};
