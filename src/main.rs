//! Shipwright deployment service.
//!
//! Main entry point for the Shipwright server. Loads configuration, wires
//! up the code generation and hosting clients, and serves the deployment
//! webhook until shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use shipwright_api::{AppState, Config};
use shipwright_pipeline::DeployPipeline;
use shipwright_services::{AiPipeClient, GithubClient};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting Shipwright deployment service");

    let config = Config::load()?;
    let addr = config.parse_server_addr()?;
    info!(%addr, notify_max_attempts = config.notify_max_attempts, "Configuration loaded");

    if config.shared_secret.is_none() {
        warn!("SHARED_SECRET is not set; deployment requests will be refused");
    }

    let codegen = match &config.aipipe_api_key {
        Some(key) => {
            match AiPipeClient::with_api_url(key.clone(), config.aipipe_api_url.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "code generation client unavailable");
                    None
                }
            }
        }
        None => {
            warn!("AIPIPE_API_KEY is not set; code generation is unavailable");
            None
        }
    };

    let hosting = match (&config.github_token, &config.github_owner) {
        (Some(token), Some(owner)) => match GithubClient::new(token.clone(), owner.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "hosting client unavailable");
                None
            }
        },
        _ => {
            warn!("GITHUB_AUTH_TOKEN or GITHUB_USERNAME is not set; hosting is unavailable");
            None
        }
    };

    let codegen_ready = codegen.is_some();
    let hosting_ready = hosting.is_some();

    let pipeline = match (codegen, hosting) {
        (Some(codegen), Some(hosting)) => {
            Some(Arc::new(DeployPipeline::new(codegen, hosting, config.to_pipeline_config())))
        }
        _ => None,
    };

    let state = AppState {
        pipeline,
        shared_secret: config.shared_secret.clone(),
        codegen_ready,
        hosting_ready,
    };

    info!(%addr, "Shipwright is ready to receive deployment webhooks");

    shipwright_api::start_server(state, addr, Duration::from_secs(config.request_timeout)).await?;

    info!("Shipwright shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,shipwright=debug,tower_http=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
