//! Git hosting client.
//!
//! [`GithubClient`] drives the GitHub REST API: it creates or reuses a
//! repository, pushes files through the contents endpoint, adds the MIT
//! license, enables Pages, and probes the published site.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Datelike;
use serde_json::json;
use shipwright_core::{Clock, CommitSha, RealClock};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Default per-request timeout for hosting API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Public REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Probes made against a fresh Pages site before giving up.
const PAGES_PROBES: u32 = 5;
/// Wait between Pages probes.
const PAGES_PROBE_INTERVAL: Duration = Duration::from_secs(10);

const MIT_LICENSE_TEMPLATE: &str = "MIT License

Copyright (c) {year} {owner}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
";

/// Failure talking to the hosting provider.
#[derive(Debug, Error)]
pub enum HostingError {
    /// Request failed in transit or timed out.
    #[error("hosting request failed: {message}")]
    Request {
        /// Underlying error description.
        message: String,
    },

    /// API answered with an unexpected status.
    #[error("hosting API returned HTTP {status} for {operation}")]
    HttpStatus {
        /// HTTP status code received.
        status: u16,
        /// Operation that failed.
        operation: &'static str,
    },

    /// Response body was missing an expected field.
    #[error("unexpected hosting API response: {message}")]
    Format {
        /// What was missing or malformed.
        message: String,
    },

    /// A URL for the repository or Pages site could not be built.
    #[error("invalid hosting URL: {message}")]
    InvalidUrl {
        /// Underlying parse error.
        message: String,
    },

    /// Client is missing its token or owner.
    #[error("hosting client is not configured: {message}")]
    Configuration {
        /// What was missing.
        message: String,
    },
}

impl HostingError {
    fn request(message: impl Into<String>) -> Self {
        Self::Request { message: message.into() }
    }

    fn format(message: impl Into<String>) -> Self {
        Self::Format { message: message.into() }
    }
}

/// Hosts generated applications.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// Creates the repository, or reuses it when it already exists.
    async fn create_repo(&self, name: &str, description: &str) -> Result<(), HostingError>;

    /// Adds the MIT license unless one is already present.
    ///
    /// Never fails a deployment: API errors are logged and absorbed.
    async fn add_license(&self, name: &str) -> Result<(), HostingError>;

    /// Pushes files to the default branch, creating or updating each one.
    /// Returns the commit SHA of the last write.
    async fn push_files(
        &self,
        name: &str,
        files: &HashMap<String, String>,
        message: &str,
    ) -> Result<CommitSha, HostingError>;

    /// Enables Pages for the repository and returns the public site URL.
    async fn enable_pages(&self, name: &str) -> Result<Url, HostingError>;

    /// Public URL the Pages site will be served from.
    fn pages_url(&self, name: &str) -> Result<Url, HostingError>;

    /// Public URL of the repository.
    fn repo_url(&self, name: &str) -> Result<Url, HostingError>;

    /// Fetches a file's raw content from the default branch.
    async fn fetch_file(&self, name: &str, path: &str) -> Result<String, HostingError>;

    /// Probes the Pages site until it answers 200 or the probe budget is
    /// spent. Non-fatal either way.
    async fn verify_pages_live(&self, url: &Url) -> bool {
        let _ = url;
        true
    }
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    owner: String,
    api_base: String,
    clock: Arc<dyn Clock>,
}

impl GithubClient {
    /// Creates a client against the public API.
    pub fn new(token: impl Into<String>, owner: impl Into<String>) -> Result<Self, HostingError> {
        Self::with_api_base(token, owner, DEFAULT_API_BASE, Arc::new(RealClock::new()))
    }

    /// Creates a client against an explicit API root, used by tests.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        api_base: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, HostingError> {
        let token = token.into();
        let owner = owner.into();
        if token.is_empty() {
            return Err(HostingError::Configuration { message: "token is empty".into() });
        }
        if owner.is_empty() {
            return Err(HostingError::Configuration { message: "owner is empty".into() });
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("shipwright/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HostingError::Configuration { message: e.to_string() })?;
        Ok(Self { http, token, owner, api_base: api_base.into(), clock })
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    /// Returns the stored blob SHA when the file already exists on main.
    async fn existing_file_sha(
        &self,
        name: &str,
        path: &str,
    ) -> Result<Option<String>, HostingError> {
        let url = self.api(&format!("/repos/{}/{name}/contents/{path}", self.owner));
        let response = self
            .authorized(self.http.get(&url).query(&[("ref", "main")]))
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| HostingError::format(e.to_string()))?;
                Ok(body["sha"].as_str().map(str::to_string))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(HostingError::HttpStatus {
                status: status.as_u16(),
                operation: "get contents",
            }),
        }
    }

    async fn put_file(
        &self,
        name: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CommitSha, HostingError> {
        let sha = self.existing_file_sha(name, path).await?;
        let mut payload = json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": "main",
        });
        if let Some(sha) = sha {
            payload["sha"] = json!(sha);
        }

        let url = self.api(&format!("/repos/{}/{name}/contents/{path}", self.owner));
        let response = self
            .authorized(self.http.put(&url).json(&payload))
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::HttpStatus {
                status: status.as_u16(),
                operation: "put contents",
            });
        }

        let body: serde_json::Value =
            response.json().await.map_err(|e| HostingError::format(e.to_string()))?;
        let sha = body["commit"]["sha"]
            .as_str()
            .ok_or_else(|| HostingError::format("missing commit.sha in contents response"))?;
        CommitSha::new(sha).map_err(|e| HostingError::format(e.to_string()))
    }
}

#[async_trait]
impl HostingProvider for GithubClient {
    async fn create_repo(&self, name: &str, description: &str) -> Result<(), HostingError> {
        let lookup = self.api(&format!("/repos/{}/{name}", self.owner));
        let response = self
            .authorized(self.http.get(&lookup))
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                warn!(repo = name, "repository already exists, reusing it");
                return Ok(());
            }
            reqwest::StatusCode::NOT_FOUND => {}
            status => {
                return Err(HostingError::HttpStatus {
                    status: status.as_u16(),
                    operation: "get repo",
                });
            }
        }

        let response = self
            .authorized(self.http.post(self.api("/user/repos")).json(&json!({
                "name": name,
                "description": description,
                "private": false,
                "auto_init": true,
            })))
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::HttpStatus {
                status: status.as_u16(),
                operation: "create repo",
            });
        }
        info!(repo = name, "repository created");
        Ok(())
    }

    async fn add_license(&self, name: &str) -> Result<(), HostingError> {
        match self.existing_file_sha(name, "LICENSE").await {
            Ok(Some(_)) => {
                info!(repo = name, "LICENSE already present, skipping");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(repo = name, error = %e, "could not check for LICENSE, skipping");
                return Ok(());
            }
        }

        let license = MIT_LICENSE_TEMPLATE
            .replace("{year}", &chrono::Utc::now().year().to_string())
            .replace("{owner}", &self.owner);
        match self.put_file(name, "LICENSE", &license, "Add MIT license").await {
            Ok(_) => info!(repo = name, "MIT license added"),
            Err(e) => warn!(repo = name, error = %e, "failed to add LICENSE"),
        }
        Ok(())
    }

    async fn push_files(
        &self,
        name: &str,
        files: &HashMap<String, String>,
        message: &str,
    ) -> Result<CommitSha, HostingError> {
        let mut last_sha: Option<CommitSha> = None;
        // Deterministic push order keeps retried deployments reproducible.
        let mut paths: Vec<&String> = files.keys().collect();
        paths.sort();

        for path in paths {
            let sha = self.put_file(name, path, &files[path], message).await?;
            info!(repo = name, file = %path, "file pushed");
            last_sha = Some(sha);
        }

        last_sha.ok_or_else(|| HostingError::format("no files to push"))
    }

    async fn enable_pages(&self, name: &str) -> Result<Url, HostingError> {
        let url = self.api(&format!("/repos/{}/{name}/pages", self.owner));
        let response = self
            .authorized(self.http.post(&url).json(&json!({
                "source": {"branch": "main", "path": "/"},
            })))
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        match response.status().as_u16() {
            201 => info!(repo = name, "Pages enabled"),
            409 => info!(repo = name, "Pages already enabled"),
            status => warn!(repo = name, status, "unexpected Pages API status"),
        }
        self.pages_url(name)
    }

    fn pages_url(&self, name: &str) -> Result<Url, HostingError> {
        Url::parse(&format!("https://{}.github.io/{name}/", self.owner))
            .map_err(|e| HostingError::InvalidUrl { message: e.to_string() })
    }

    fn repo_url(&self, name: &str) -> Result<Url, HostingError> {
        Url::parse(&format!("https://github.com/{}/{name}", self.owner))
            .map_err(|e| HostingError::InvalidUrl { message: e.to_string() })
    }

    async fn fetch_file(&self, name: &str, path: &str) -> Result<String, HostingError> {
        let url = self.api(&format!("/repos/{}/{name}/contents/{path}", self.owner));
        let response = self
            .http
            .get(&url)
            .query(&[("ref", "main")])
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await
            .map_err(|e| HostingError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::HttpStatus {
                status: status.as_u16(),
                operation: "fetch file",
            });
        }
        response.text().await.map_err(|e| HostingError::format(e.to_string()))
    }

    async fn verify_pages_live(&self, url: &Url) -> bool {
        for probe in 0..PAGES_PROBES {
            match self.http.get(url.clone()).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    info!(%url, probe = probe + 1, "Pages site is live");
                    return true;
                }
                Ok(response) => {
                    info!(%url, probe = probe + 1, status = response.status().as_u16(), "Pages site not ready");
                }
                Err(e) => {
                    info!(%url, probe = probe + 1, error = %e, "Pages probe failed");
                }
            }
            if probe + 1 < PAGES_PROBES {
                self.clock.sleep(PAGES_PROBE_INTERVAL).await;
            }
        }
        warn!(%url, "Pages site did not come up within the probe budget");
        false
    }
}
