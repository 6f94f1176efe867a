//! Shipwright HTTP API.
//!
//! Exposes the deployment webhook and health endpoints, authenticates
//! requests against the shared secret, and hands accepted deployments to
//! the background pipeline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod handlers;
pub mod server;

use std::sync::Arc;

use shipwright_pipeline::DeployPipeline;

pub use config::Config;
pub use server::{create_router, start_server};

/// Shared state for all request handlers.
///
/// The server starts even when collaborators are unconfigured so health
/// endpoints stay reachable; the deploy endpoint answers 500 until the
/// missing configuration is supplied.
#[derive(Clone)]
pub struct AppState {
    /// Background pipeline, absent when hosting or generation is unconfigured.
    pub pipeline: Option<Arc<DeployPipeline>>,
    /// Shared secret deployment requests must present.
    pub shared_secret: Option<String>,
    /// Whether the code generation client is configured.
    pub codegen_ready: bool,
    /// Whether the hosting client is configured.
    pub hosting_ready: bool,
}
