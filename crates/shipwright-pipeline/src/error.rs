//! Pipeline error type.

use shipwright_core::CoreError;
use shipwright_delivery::DeliveryError;
use shipwright_services::{GenerationError, HostingError};
use thiserror::Error;

/// Failure of a deployment run before the notification stage.
///
/// Once a run reaches the notification stage it no longer fails; delivery
/// records its own outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Code generation failed in a way the generator did not absorb.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A hosting step failed.
    #[error(transparent)]
    Hosting(#[from] HostingError),

    /// The evaluation report could not be constructed.
    #[error(transparent)]
    Report(#[from] CoreError),

    /// The notification channel could not be opened.
    #[error(transparent)]
    Notification(#[from] DeliveryError),
}
