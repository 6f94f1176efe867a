//! Deployment pipeline runner.

use std::collections::HashMap;
use std::sync::Arc;

use shipwright_core::{
    util::{commit_message, sanitize_repo_name},
    Clock, DeploymentRequest, EvaluationReport, RealClock, Round,
};
use shipwright_delivery::{ChannelConfig, DeliveryOutcome, NotificationChannel, Notifier};
use shipwright_services::{CodeGenerator, HostingProvider};
use tracing::{error, info, info_span, warn, Instrument};

use crate::error::PipelineError;

/// Per-repository mutexes so concurrent webhooks for the same task do not
/// interleave their hosting writes.
#[derive(Debug, Clone, Default)]
struct NameLocks {
    inner: Arc<std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NameLocks {
    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // An entry only the map still holds has no deployment in flight.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(name.to_string()).or_default().clone()
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Notification channel settings.
    pub channel: ChannelConfig,
    /// Attempt budget for the completion notification.
    pub max_notify_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { channel: ChannelConfig::default(), max_notify_attempts: 5 }
    }
}

/// Runs deployments end to end.
pub struct DeployPipeline {
    codegen: Arc<dyn CodeGenerator>,
    hosting: Arc<dyn HostingProvider>,
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    locks: NameLocks,
}

impl DeployPipeline {
    /// Creates a pipeline over the given collaborators.
    pub fn new(
        codegen: Arc<dyn CodeGenerator>,
        hosting: Arc<dyn HostingProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self::with_clock(codegen, hosting, config, Arc::new(RealClock::new()))
    }

    /// Creates a pipeline with an injected clock, used by tests.
    pub fn with_clock(
        codegen: Arc<dyn CodeGenerator>,
        hosting: Arc<dyn HostingProvider>,
        config: PipelineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { codegen, hosting, config, clock, locks: NameLocks::default() }
    }

    /// Runs one deployment to completion.
    ///
    /// Intended for `tokio::spawn` off the webhook path: it never returns an
    /// error, every failure is logged here.
    pub async fn run(&self, request: DeploymentRequest) {
        let span = info_span!(
            "deployment",
            task = %request.task,
            round = %request.round,
            nonce = %request.nonce,
        );
        async {
            match self.execute(&request).await {
                Ok(outcome) if outcome.delivered => {
                    info!(attempts = outcome.attempts, "deployment completed and reported");
                }
                Ok(outcome) => {
                    warn!(
                        attempts = outcome.attempts,
                        detail = outcome.detail.as_deref().unwrap_or(""),
                        "deployment completed but the evaluation endpoint was never reached"
                    );
                }
                Err(e) => {
                    error!(error = %e, "deployment failed before notification");
                }
            }
        }
        .instrument(span)
        .await;
    }

    /// Runs the deployment steps and delivers the completion report.
    pub async fn execute(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeliveryOutcome, PipelineError> {
        let repo_name = sanitize_repo_name(&request.task);
        let lock = self.locks.lock_for(&repo_name);
        let _guard = lock.lock().await;

        let files = match request.round {
            Round::First => self.initial_deployment(request, &repo_name).await?,
            Round::Second => self.revision_deployment(request, &repo_name).await?,
        };

        let message = commit_message(request.round, &request.task);
        let commit_sha = self.hosting.push_files(&repo_name, &files, &message).await?;

        // Pages only needs enabling on the initial deployment; a revision
        // resolves the URL the repository already serves from.
        let pages_url = match request.round {
            Round::First => {
                let url = self.hosting.enable_pages(&repo_name).await?;
                if !self.hosting.verify_pages_live(&url).await {
                    warn!(pages_url = %url, "site not confirmed live, reporting anyway");
                }
                url
            }
            Round::Second => self.hosting.pages_url(&repo_name)?,
        };
        let repo_url = self.hosting.repo_url(&repo_name)?;

        let report = EvaluationReport::new(request, repo_url, commit_sha, pages_url)?;

        let channel = NotificationChannel::open(self.config.channel.clone())?;
        let notifier = Notifier::with_clock(channel, self.clock.clone());
        Ok(notifier
            .deliver(
                request.evaluation_url.as_str(),
                &report,
                self.config.max_notify_attempts,
            )
            .await)
    }

    /// Round one: generate fresh content, then create the repository.
    ///
    /// Attachments inform the generation prompt only; they are not pushed.
    /// No hosting call happens until generation has produced something to
    /// host.
    async fn initial_deployment(
        &self,
        request: &DeploymentRequest,
        repo_name: &str,
    ) -> Result<HashMap<String, String>, PipelineError> {
        let mut files = self
            .codegen
            .generate_app(&request.brief, &request.checks, &request.attachments)
            .await?;
        let readme = self
            .codegen
            .generate_readme(&request.task, &request.brief, &request.checks)
            .await?;
        files.insert("README.md".to_string(), readme);

        self.hosting.create_repo(repo_name, &request.brief).await?;
        self.hosting.add_license(repo_name).await?;

        Ok(files)
    }

    /// Round two: fetch the deployed content and revise it in place.
    ///
    /// If the deployed application cannot be fetched there is nothing to
    /// revise and the run aborts before any notification is sent.
    async fn revision_deployment(
        &self,
        request: &DeploymentRequest,
        repo_name: &str,
    ) -> Result<HashMap<String, String>, PipelineError> {
        let existing = self.hosting.fetch_file(repo_name, "index.html").await?;

        let mut files = self
            .codegen
            .revise_app(&existing, &request.brief, None)
            .await?;

        match self.hosting.fetch_file(repo_name, "README.md").await {
            Ok(existing_readme) => {
                let readme = self
                    .codegen
                    .revise_readme(&existing_readme, &request.brief)
                    .await?;
                files.insert("README.md".to_string(), readme);
            }
            Err(e) => {
                warn!(error = %e, "existing README not found, leaving it untouched");
            }
        }

        Ok(files)
    }
}
