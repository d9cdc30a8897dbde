use serde::Serialize;
use std::error::Error as _;
use thiserror::Error;

const SUGGEST_AUTH: &str = "Check your SENTRY_AUTH_TOKEN. Ensure it has the required scopes (project:read, event:read, event:write).";
const SUGGEST_FORBIDDEN: &str = "You don't have permission to access this resource. Check your token scopes and organization membership.";
const SUGGEST_NOT_FOUND: &str = "The resource was not found. Verify the project slug, issue ID, or organization name is correct.";
const SUGGEST_RATE_LIMIT: &str = "Rate limit exceeded. Wait a moment before retrying. Consider reducing request frequency.";
const SUGGEST_SERVER: &str = "Sentry server error. This is temporary - retry in a few moments.";
const SUGGEST_NETWORK: &str = "Check your Sentry URL and network connection.";
const SUGGEST_GENERIC: &str =
    "Check the error message and try again. Ensure your configuration is correct.";

/// Failures of a single call against the Sentry REST API.
#[derive(Debug, Error)]
pub enum SentryError {
    /// The server answered with a non-2xx status.
    #[error("Sentry API Error: {status_code} {status_text}")]
    Upstream {
        status_code: u16,
        status_text: String,
        suggestion: &'static str,
        details: String,
    },
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SentryError {
    pub fn upstream(status_code: u16, status_text: impl Into<String>, details: String) -> Self {
        Self::Upstream {
            status_code,
            status_text: status_text.into(),
            suggestion: suggestion_for_status(status_code),
            details,
        }
    }
}

/// Remediation hint for an upstream HTTP status.
pub fn suggestion_for_status(status_code: u16) -> &'static str {
    match status_code {
        401 => SUGGEST_AUTH,
        403 => SUGGEST_FORBIDDEN,
        404 => SUGGEST_NOT_FOUND,
        429 => SUGGEST_RATE_LIMIT,
        500..=599 => SUGGEST_SERVER,
        _ => SUGGEST_NETWORK,
    }
}

/// Startup failures. These are fatal: the server cannot run without a target and a token.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "SENTRY_URL environment variable is required. Set it to your Sentry instance URL (e.g., https://sentry.io or https://sentry.mycompany.com)"
    )]
    MissingUrl,
    #[error(
        "SENTRY_AUTH_TOKEN environment variable is required. Create an auth token at {{SENTRY_URL}}/settings/account/api/auth-tokens/ with scopes: project:read, event:read, event:write"
    )]
    MissingAuthToken,
    #[error("SENTRY_AUTH_TOKEN contains characters that are not valid in an HTTP header")]
    InvalidAuthToken,
    #[error("invalid proxy URL {url}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Error payload returned across the tool boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorOutput {
    pub error: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorOutput {
    pub fn new(error: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            suggestion: suggestion.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// A required identifier had neither an explicit value nor a configured default.
    pub fn not_specified(what: &str, env_var: &str, param: &str) -> Self {
        Self::new(
            format!("{what} not specified"),
            format!("Set {env_var} in the server environment or pass the {param} parameter"),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(
            message,
            "Check your input parameters and try again. Ensure all required fields are provided.",
        )
    }
}

impl From<SentryError> for ErrorOutput {
    fn from(err: SentryError) -> Self {
        match err {
            SentryError::Upstream {
                status_code,
                status_text,
                suggestion,
                details,
            } => Self {
                error: format!("Sentry API Error: {} {}", status_code, status_text),
                suggestion: suggestion.to_string(),
                details: Some(details),
            },
            other => {
                let mut chain = Vec::new();
                let mut source = other.source();
                while let Some(cause) = source {
                    chain.push(cause.to_string());
                    source = cause.source();
                }
                let output = ErrorOutput::new(other.to_string(), SUGGEST_GENERIC);
                if chain.is_empty() {
                    output
                } else {
                    output.with_details(chain.join(": "))
                }
            }
        }
    }
}
