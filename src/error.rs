use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum EpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Remote API error (status: {status:?}): {message}")]
    Api {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Export task {task_id} timed out after {seconds}s")]
    ExportTimeout { task_id: String, seconds: u64 },

    #[error("Export archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid page id: '{0}'")]
    InvalidPageId(String),

    #[error("Renderer error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EpcError {
    pub fn api(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        EpcError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        EpcError::Render(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            EpcError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check the data directory path and its permissions.",
            ),
            EpcError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            EpcError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify [api] base_url in the config (e.g., https://www.notion.so).",
            ),
            EpcError::Api { status, message } => {
                let remediation = match status.map(|s| s.as_u16()) {
                    Some(401) | Some(403) => {
                        "Set NOTION_TOKEN to a valid token_v2 cookie value; exports need an authenticated session."
                    }
                    Some(429) => "Rate limited by the remote service; wait and rerun.",
                    _ => "Check that the page exists and is shared with the token's account.",
                };
                ErrorPayload::new(
                    ErrorCategory::Api,
                    format!("Remote API error (status {:?}): {}", status, message),
                    remediation,
                )
            }
            EpcError::ExportTimeout { .. } => ErrorPayload::new(
                ErrorCategory::Api,
                self.to_string(),
                "The service is still building the export; increase [api] export_timeout in the config.",
            ),
            EpcError::Archive(e) => ErrorPayload::new(
                ErrorCategory::Api,
                e.to_string(),
                "The export did not download as a valid ZIP archive; rerun the check.",
            ),
            EpcError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Api,
                e.to_string(),
                "Unexpected response shape from the remote service; run with --verbose for details.",
            ),
            EpcError::InvalidPageId(id) => ErrorPayload::new(
                ErrorCategory::Config,
                format!("'{}' is not a valid page id", id),
                "Pass a 32-character hex page id (dashes optional) or a full page URL.",
            ),
            EpcError::Render(msg) => {
                let lower = msg.to_ascii_lowercase();
                let remediation = if lower.contains("not found on path") {
                    "Install the converter or point [renderer] command at its executable."
                } else {
                    "Inspect the converter's stderr above; rerun with --verbose for the full command line."
                };
                ErrorPayload::new(ErrorCategory::Render, msg.to_string(), remediation)
            }
            EpcError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("notion_token") || lower.contains("token") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Set NOTION_TOKEN (the token_v2 cookie) before running exports.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags and config file values.",
                    )
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EpcError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Api,
    Render,
    Io,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
