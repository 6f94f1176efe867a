//! Core domain models and validation.
//!
//! Provides the deployment request/report types, repository naming helpers,
//! data-URI decoding, and the clock abstraction shared by every other crate
//! in the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;
pub mod util;

pub use error::{CoreError, Result};
pub use models::{Attachment, CommitSha, DeploymentRequest, EvaluationReport, Round};
pub use time::{Clock, RealClock, TestClock};
