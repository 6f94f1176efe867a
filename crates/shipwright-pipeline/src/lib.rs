//! Deployment pipeline.
//!
//! [`DeployPipeline`] runs one webhook's worth of work off the request path:
//! generate or revise the application, push it to the hosting provider,
//! enable the public site, then report completion to the evaluation endpoint
//! with retries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod runner;

pub use error::PipelineError;
pub use runner::{DeployPipeline, PipelineConfig};
