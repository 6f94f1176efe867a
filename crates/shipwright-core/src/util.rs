//! Small helpers for repository naming, commit messages, and data URIs.

use base64::Engine;

use crate::error::{CoreError, Result};
use crate::models::Round;

/// Maximum length of a generated repository name.
const MAX_REPO_NAME_LEN: usize = 100;

/// Derives a hosting-safe repository name from a task name.
///
/// Lowercases the input, maps every character outside `[a-z0-9-]` to a
/// hyphen, collapses runs of hyphens, and trims leading and trailing
/// hyphens. An input with no usable characters falls back to a
/// timestamp-derived name.
pub fn sanitize_repo_name(task: &str) -> String {
    let mut name = String::with_capacity(task.len());
    let mut last_hyphen = true;
    for c in task.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            name.push(c);
            last_hyphen = false;
        } else if !last_hyphen {
            name.push('-');
            last_hyphen = true;
        }
    }
    while name.ends_with('-') {
        name.pop();
    }
    if name.is_empty() {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        name = format!("repo-{ts}");
    }
    name.truncate(MAX_REPO_NAME_LEN);
    while name.ends_with('-') {
        name.pop();
    }
    name
}

/// Commit message for a deployment round.
pub fn commit_message(round: Round, task: &str) -> String {
    match round {
        Round::First => format!("Initial deployment for {task}"),
        Round::Second => format!("Revision update for {task} (Round 2)"),
    }
}

/// Decoded contents of an inline `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared media type, `text/plain` when absent.
    pub mime_type: String,
    /// Raw decoded bytes.
    pub data: Vec<u8>,
}

/// Decodes a `data:[<mime>][;base64],<payload>` URI.
///
/// Base64 payloads are decoded; plain payloads are percent-decoded only as
/// far as taking the raw bytes, which matches how attachments are produced
/// upstream.
pub fn decode_data_uri(uri: &str) -> Result<DataUri> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CoreError::InvalidDataUri {
            message: "missing data: prefix".into(),
        })?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| CoreError::InvalidDataUri {
        message: "missing comma separator".into(),
    })?;

    let (mime_type, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime_type = if mime_type.is_empty() {
        "text/plain".to_string()
    } else {
        mime_type.to_string()
    };

    let data = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| CoreError::InvalidDataUri {
                message: format!("invalid base64 payload: {e}"),
            })?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DataUri { mime_type, data })
}
