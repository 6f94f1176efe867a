//! Domain types shared across the deployment pipeline.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};
use crate::util::{decode_data_uri, DataUri};

/// Deployment round, either the initial delivery or the revision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    /// Initial deployment: generate the app from scratch.
    First,
    /// Revision: fetch the deployed app and revise it in place.
    Second,
}

impl TryFrom<u8> for Round {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Round::First),
            2 => Ok(Round::Second),
            other => Err(CoreError::InvalidRound { value: other }),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> u8 {
        match round {
            Round::First => 1,
            Round::Second => 2,
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Full commit SHA returned by the hosting provider after a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    /// Validates and wraps a 40-character hex commit SHA.
    ///
    /// Input is lowercased before validation, so uppercase hex is accepted.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().to_lowercase();
        if value.len() != 40 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidCommitSha { value });
        }
        Ok(Self(value))
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitSha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// File attachment carried inline in the webhook as a data URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// File name to write into the generated repository.
    pub name: String,
    /// Inline `data:` URI holding the file content.
    pub url: String,
}

impl Attachment {
    /// Decodes the inline data URI into its mime type and raw bytes.
    pub fn decode(&self) -> Result<DataUri> {
        decode_data_uri(&self.url)
    }
}

/// Incoming deployment webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentRequest {
    /// Requester email, echoed back in the evaluation report.
    pub email: String,
    /// Shared secret used to authenticate the webhook.
    pub secret: String,
    /// Human-readable task name, also the basis of the repository name.
    pub task: String,
    /// Deployment round.
    pub round: Round,
    /// Opaque correlation token, echoed back in the evaluation report.
    pub nonce: String,
    /// Natural-language description of the app to build or the revision to make.
    pub brief: String,
    /// Acceptance checks the generated app should satisfy.
    #[serde(default)]
    pub checks: Vec<String>,
    /// Endpoint to notify once the deployment is live.
    pub evaluation_url: Url,
    /// Inline file attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl DeploymentRequest {
    /// Validates field contents beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() || !self.email.contains('@') || !self.email.contains('.') {
            return Err(CoreError::validation("email", "must be a valid email address"));
        }
        if self.secret.is_empty() {
            return Err(CoreError::validation("secret", "must not be empty"));
        }
        if self.task.trim().is_empty() {
            return Err(CoreError::validation("task", "must not be empty"));
        }
        if self.nonce.is_empty() {
            return Err(CoreError::validation("nonce", "must not be empty"));
        }
        if self.brief.trim().len() < 10 {
            return Err(CoreError::validation("brief", "must be at least 10 characters"));
        }
        if self.checks.is_empty() {
            return Err(CoreError::validation("checks", "must contain at least one check"));
        }
        for attachment in &self.attachments {
            if let Err(e) = attachment.decode() {
                return Err(CoreError::validation(
                    "attachments",
                    format!("'{}': {e}", attachment.name),
                ));
            }
        }
        Ok(())
    }
}

/// Completion report POSTed to the evaluation endpoint.
///
/// URL fields serialize as plain JSON strings.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Requester email from the originating webhook.
    pub email: String,
    /// Task name from the originating webhook.
    pub task: String,
    /// Deployment round.
    pub round: Round,
    /// Correlation token from the originating webhook.
    pub nonce: String,
    /// Public URL of the created repository.
    pub repo_url: Url,
    /// Commit SHA of the deployed revision.
    pub commit_sha: CommitSha,
    /// Public URL the deployed app is served from.
    pub pages_url: Url,
}

impl EvaluationReport {
    /// Builds a report from the originating request and the deployment artifacts.
    ///
    /// Rejects repository and pages URLs that do not point at the hosting
    /// provider, so a misconfigured client cannot report an arbitrary
    /// location as the deployment.
    pub fn new(
        request: &DeploymentRequest,
        repo_url: Url,
        commit_sha: CommitSha,
        pages_url: Url,
    ) -> Result<Self> {
        if repo_url.host_str() != Some("github.com") {
            return Err(CoreError::InvalidReportUrl { url: repo_url.to_string() });
        }
        let pages_host = pages_url.host_str().unwrap_or("");
        if !pages_host.ends_with(".github.io") {
            return Err(CoreError::InvalidReportUrl { url: pages_url.to_string() });
        }
        Ok(Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url,
            commit_sha,
            pages_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DeploymentRequest {
        serde_json::from_value(serde_json::json!({
            "email": "dev@example.com",
            "secret": "s3cret",
            "task": "captcha-solver",
            "round": 1,
            "nonce": "ab12",
            "brief": "Build a captcha solver that handles ?url= inputs",
            "checks": ["repo has MIT license"],
            "evaluation_url": "https://eval.example.com/notify",
            "attachments": []
        }))
        .unwrap()
    }

    #[test]
    fn round_accepts_one_and_two_only() {
        assert_eq!(Round::try_from(1).unwrap(), Round::First);
        assert_eq!(Round::try_from(2).unwrap(), Round::Second);
        assert!(Round::try_from(0).is_err());
        assert!(Round::try_from(3).is_err());
    }

    #[test]
    fn round_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Round::Second).unwrap(), "2");
        let round: Round = serde_json::from_str("1").unwrap();
        assert_eq!(round, Round::First);
    }

    #[test]
    fn commit_sha_requires_forty_hex_chars() {
        let sha = "a".repeat(40);
        assert!(CommitSha::new(&sha).is_ok());
        assert!(CommitSha::new("abc123").is_err());
        assert!(CommitSha::new("g".repeat(40)).is_err());
    }

    #[test]
    fn commit_sha_lowercases_input() {
        let sha = CommitSha::new("ABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(sha.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn commit_sha_serializes_transparently() {
        let sha = CommitSha::new("a".repeat(40)).unwrap();
        let json = serde_json::to_string(&sha).unwrap();
        assert_eq!(json, format!("\"{}\"", "a".repeat(40)));
    }

    #[test]
    fn deserializes_webhook_payload() {
        let req = request();
        assert_eq!(req.round, Round::First);
        assert_eq!(req.evaluation_url.as_str(), "https://eval.example.com/notify");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_brief() {
        let mut req = request();
        req.brief = "too short".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_checks() {
        let mut req = request();
        req.checks.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_email() {
        let mut req = request();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_data_uri_attachment() {
        let mut req = request();
        req.attachments.push(Attachment {
            name: "sample.png".into(),
            url: "https://example.com/sample.png".into(),
        });
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("attachments"));
        assert!(err.to_string().contains("sample.png"));
    }

    #[test]
    fn validate_rejects_undecodable_attachment_payload() {
        let mut req = request();
        req.attachments.push(Attachment {
            name: "sample.txt".into(),
            url: "data:text/plain;base64,!!!".into(),
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_attachment() {
        let mut req = request();
        req.attachments.push(Attachment {
            name: "sample.txt".into(),
            url: "data:text/plain;base64,aGVsbG8=".into(),
        });
        assert!(req.validate().is_ok());
    }

    #[test]
    fn report_url_fields_serialize_as_strings() {
        let req = request();
        let report = EvaluationReport::new(
            &req,
            Url::parse("https://github.com/dev/captcha-solver").unwrap(),
            CommitSha::new("b".repeat(40)).unwrap(),
            Url::parse("https://dev.github.io/captcha-solver/").unwrap(),
        )
        .unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["repo_url"], "https://github.com/dev/captcha-solver");
        assert_eq!(value["pages_url"], "https://dev.github.io/captcha-solver/");
        assert_eq!(value["round"], 1);
        assert_eq!(value["commit_sha"], "b".repeat(40));
    }

    #[test]
    fn report_rejects_non_hosting_repo_url() {
        let req = request();
        let err = EvaluationReport::new(
            &req,
            Url::parse("https://example.com/dev/captcha-solver").unwrap(),
            CommitSha::new("b".repeat(40)).unwrap(),
            Url::parse("https://dev.github.io/captcha-solver/").unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn report_rejects_lookalike_hosting_domain() {
        let req = request();
        let err = EvaluationReport::new(
            &req,
            Url::parse("https://notgithub.evil.com/dev/captcha-solver").unwrap(),
            CommitSha::new("b".repeat(40)).unwrap(),
            Url::parse("https://dev.github.io/captcha-solver/").unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn report_rejects_non_hosting_pages_url() {
        let req = request();
        let err = EvaluationReport::new(
            &req,
            Url::parse("https://github.com/dev/captcha-solver").unwrap(),
            CommitSha::new("b".repeat(40)).unwrap(),
            Url::parse("https://evil.com/captcha-solver/").unwrap(),
        );
        assert!(err.is_err());
    }
}
