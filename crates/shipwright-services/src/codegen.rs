//! LLM-backed code generation.
//!
//! [`AiPipeClient`] drives a chat-completions gateway to produce a
//! single-page static app and its README. Generation failures degrade to a
//! placeholder page rather than aborting the deployment; revision failures
//! keep the already-deployed content.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use shipwright_core::Attachment;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default per-request timeout for generation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://aipipe.org/openrouter/v1/chat/completions";

/// Model used for initial generation.
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
/// Stronger model used for revisions, which must respect existing code.
const ADVANCED_MODEL: &str = "openai/gpt-4o";

const APP_PROMPT: &str = "Write a complete single-file static web application as index.html. \
It must be self-contained: inline CSS and JavaScript, no build step, no external \
dependencies beyond public CDNs. Respond with the HTML document only, no explanation.";

const README_PROMPT: &str = "Write a README.md for a small static web application. Include a \
short description, a usage section, and a license section referencing the MIT license. \
Respond with the markdown only, no explanation.";

const REVISION_PROMPT: &str = "Revise the following deployed single-file web application \
according to the revision request. Preserve working behavior that the request does not \
mention. Respond with the complete updated HTML document only, no explanation.";

const README_REVISION_PROMPT: &str = "Update the following README.md to reflect a revision \
to the application. Respond with the complete updated markdown only, no explanation.";

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Deployment placeholder</title>
</head>
<body>
<h1>Deployment placeholder</h1>
<p>Automatic generation was unavailable. The requested application:</p>
<pre id="brief">{brief}</pre>
</body>
</html>
"#;

const FALLBACK_README: &str = "# {title}\n\nPlaceholder deployment for `{task}`.\n\n\
## Brief\n\n{brief}\n\n## License\n\nMIT\n";

/// Failure talking to the generation gateway.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Request failed in transit or timed out.
    #[error("generation request failed: {message}")]
    Request {
        /// Underlying error description.
        message: String,
    },

    /// Gateway answered with a non-success status.
    #[error("generation gateway returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code received.
        status: u16,
    },

    /// Response body did not contain a completion.
    #[error("unexpected gateway response format: {message}")]
    Format {
        /// What was missing or malformed.
        message: String,
    },

    /// Client is missing its API key.
    #[error("generation client is not configured: {message}")]
    Configuration {
        /// What was missing.
        message: String,
    },
}

impl GenerationError {
    fn request(message: impl Into<String>) -> Self {
        Self::Request { message: message.into() }
    }

    fn format(message: impl Into<String>) -> Self {
        Self::Format { message: message.into() }
    }
}

/// Produces and revises application content.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Generates the application files for a fresh deployment.
    ///
    /// Returns a map of file path to file content, always containing
    /// `index.html`.
    async fn generate_app(
        &self,
        brief: &str,
        checks: &[String],
        attachments: &[Attachment],
    ) -> Result<HashMap<String, String>, GenerationError>;

    /// Generates the README for a fresh deployment.
    async fn generate_readme(
        &self,
        task: &str,
        brief: &str,
        checks: &[String],
    ) -> Result<String, GenerationError>;

    /// Revises an already-deployed application.
    ///
    /// `original_brief` is the round-one brief when the caller has it.
    async fn revise_app(
        &self,
        existing: &str,
        revision_brief: &str,
        original_brief: Option<&str>,
    ) -> Result<HashMap<String, String>, GenerationError>;

    /// Revises an already-deployed README.
    async fn revise_readme(
        &self,
        existing: &str,
        revision_brief: &str,
    ) -> Result<String, GenerationError>;
}

/// Chat-completions client for the AI Pipe gateway.
#[derive(Debug, Clone)]
pub struct AiPipeClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    default_model: String,
    advanced_model: String,
}

impl AiPipeClient {
    /// Creates a client against the default gateway endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_api_url(api_key, DEFAULT_API_URL)
    }

    /// Creates a client against an explicit endpoint, used by tests.
    pub fn with_api_url(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(GenerationError::Configuration {
                message: "API key is empty".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Configuration { message: e.to_string() })?;
        Ok(Self {
            http,
            api_key,
            api_url: api_url.into(),
            default_model: DEFAULT_MODEL.into(),
            advanced_model: ADVANCED_MODEL.into(),
        })
    }

    async fn chat(
        &self,
        prompt: String,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let payload = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!(model, "sending generation request");
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::HttpStatus { status: status.as_u16() });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::format(e.to_string()))?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::format("missing choices[0].message.content"))
    }

    fn app_prompt(brief: &str, checks: &[String], attachments: &[Attachment]) -> String {
        let mut prompt = format!("{APP_PROMPT}\n\nRequirements:\n{brief}\n\nThe app must pass these checks:\n");
        for (i, check) in checks.iter().enumerate() {
            prompt.push_str(&format!("{}. {check}\n", i + 1));
        }
        if !attachments.is_empty() {
            prompt.push_str(&format!(
                "\nThe repository also contains {} attached data file(s): {}. \
                 Reference them by relative path where relevant.\n",
                attachments.len(),
                attachments.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", "),
            ));
        }
        prompt
    }
}

/// Strips markdown code fences and leading prose from a completion.
fn clean_response(text: &str) -> String {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```html") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let mut text = text.trim().to_string();

    if !text.starts_with("<!DOCTYPE") && !text.starts_with("<html") {
        if let Some(pos) = text.find("<!DOCTYPE") {
            text = text[pos..].to_string();
        }
    }
    text
}

fn title_case(task: &str) -> String {
    task.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fallback_html(brief: &str) -> HashMap<String, String> {
    let mut files = HashMap::new();
    files.insert("index.html".to_string(), FALLBACK_HTML.replace("{brief}", brief));
    files
}

fn fallback_readme(task: &str, brief: &str) -> String {
    FALLBACK_README
        .replace("{title}", &title_case(task))
        .replace("{task}", task)
        .replace("{brief}", brief)
}

#[async_trait]
impl CodeGenerator for AiPipeClient {
    async fn generate_app(
        &self,
        brief: &str,
        checks: &[String],
        attachments: &[Attachment],
    ) -> Result<HashMap<String, String>, GenerationError> {
        let prompt = Self::app_prompt(brief, checks, attachments);
        match self.chat(prompt, &self.default_model, 0.2, 8192).await {
            Ok(text) => {
                info!("generated application code");
                let mut files = HashMap::new();
                files.insert("index.html".to_string(), clean_response(&text));
                Ok(files)
            }
            Err(e) => {
                warn!(error = %e, "generation failed, using placeholder page");
                Ok(fallback_html(brief))
            }
        }
    }

    async fn generate_readme(
        &self,
        task: &str,
        brief: &str,
        checks: &[String],
    ) -> Result<String, GenerationError> {
        let checks_text: String = checks.iter().map(|c| format!("- {c}\n")).collect();
        let prompt = format!(
            "{README_PROMPT}\n\nProject: {title} ({task})\nBrief: {brief}\nChecks:\n{checks_text}",
            title = title_case(task),
        );
        match self.chat(prompt, &self.default_model, 0.2, 4096).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "README generation failed, using placeholder");
                Ok(fallback_readme(task, brief))
            }
        }
    }

    async fn revise_app(
        &self,
        existing: &str,
        revision_brief: &str,
        original_brief: Option<&str>,
    ) -> Result<HashMap<String, String>, GenerationError> {
        let mut prompt = format!("{REVISION_PROMPT}\n\n");
        if let Some(original) = original_brief {
            prompt.push_str(&format!("Original brief:\n{original}\n\n"));
        }
        prompt.push_str(&format!(
            "Current code:\n{existing}\n\nRevision request:\n{revision_brief}\n"
        ));

        match self.chat(prompt, &self.advanced_model, 0.3, 8192).await {
            Ok(text) => {
                info!("revised application code");
                let mut files = HashMap::new();
                files.insert("index.html".to_string(), clean_response(&text));
                Ok(files)
            }
            Err(e) => {
                warn!(error = %e, "revision failed, keeping deployed code");
                let mut files = HashMap::new();
                files.insert("index.html".to_string(), existing.to_string());
                Ok(files)
            }
        }
    }

    async fn revise_readme(
        &self,
        existing: &str,
        revision_brief: &str,
    ) -> Result<String, GenerationError> {
        let prompt = format!(
            "{README_REVISION_PROMPT}\n\nCurrent README:\n{existing}\n\nRevision request:\n{revision_brief}\n"
        );
        match self.chat(prompt, &self.advanced_model, 0.3, 4096).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "README revision failed, keeping deployed README");
                Ok(existing.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn clean_response_strips_fences() {
        assert_eq!(clean_response("```html\n<html></html>\n```"), "<html></html>");
        assert_eq!(clean_response("```\n<html></html>\n```"), "<html></html>");
        assert_eq!(clean_response("<html></html>"), "<html></html>");
    }

    #[test]
    fn clean_response_drops_leading_prose() {
        let cleaned = clean_response("Here is the page:\n<!DOCTYPE html><html></html>");
        assert!(cleaned.starts_with("<!DOCTYPE html"));
    }

    #[test]
    fn title_case_from_repo_name() {
        assert_eq!(title_case("captcha-solver-2025"), "Captcha Solver 2025");
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(AiPipeClient::new("").is_err());
    }

    #[tokio::test]
    async fn generate_app_parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("```html\n<!DOCTYPE html><html></html>\n```")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client =
            AiPipeClient::with_api_url("test-key", format!("{}/v1/chat/completions", server.uri()))
                .unwrap();
        let files = client
            .generate_app("Build a greeting page", &["shows a greeting".into()], &[])
            .await
            .unwrap();
        assert_eq!(files["index.html"], "<!DOCTYPE html><html></html>");
    }

    #[tokio::test]
    async fn generate_app_falls_back_on_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AiPipeClient::with_api_url("test-key", server.uri()).unwrap();
        let files = client
            .generate_app("Build a greeting page", &["shows a greeting".into()], &[])
            .await
            .unwrap();
        assert!(files["index.html"].contains("Build a greeting page"));
        assert!(files["index.html"].starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn revise_app_keeps_existing_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AiPipeClient::with_api_url("test-key", server.uri()).unwrap();
        let files = client
            .revise_app("<html>deployed</html>", "Add dark mode", None)
            .await
            .unwrap();
        assert_eq!(files["index.html"], "<html>deployed</html>");
    }

    #[tokio::test]
    async fn revision_uses_advanced_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("<html>v2</html>")))
            .mount(&server)
            .await;

        let client = AiPipeClient::with_api_url("test-key", server.uri()).unwrap();
        client
            .revise_app("<html>v1</html>", "Add dark mode", Some("A greeting page"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "openai/gpt-4o");
    }
}
