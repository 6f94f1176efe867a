//! Request handlers.

pub mod deploy;
pub mod health;

pub use deploy::deploy_webhook;
pub use health::{health_check, root_info};
