//! External service clients for the deployment pipeline.
//!
//! [`codegen`] talks to the LLM gateway that writes the application, and
//! [`hosting`] talks to the Git hosting provider that serves it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codegen;
pub mod hosting;

pub use codegen::{AiPipeClient, CodeGenerator, GenerationError};
pub use hosting::{GithubClient, HostingError, HostingProvider};
