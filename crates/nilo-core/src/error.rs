// ── Core error types ──
//
// What the dashboard surfaces to its nearest UI boundary. Transport
// details are folded into a small taxonomy; the `From<nilo_api::Error>`
// impl is the only place that knows about HTTP-level failures.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Session / credentials ────────────────────────────────────────
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("No stored API key is usable for {target}")]
    NoCredentialAvailable { target: String },

    // ── Fetch failures ───────────────────────────────────────────────
    #[error("Authentication kept failing after {attempts} attempts")]
    AuthenticationExhausted { attempts: u32 },

    #[error("Network kept failing after {attempts} attempts: {reason}")]
    NetworkExhausted { attempts: u32, reason: String },

    #[error("Request failed with HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// The owner of the request cancelled it. Never shown to users.
    #[error("Cancelled")]
    Cancelled,

    // ── Workflow errors ──────────────────────────────────────────────
    #[error("Unknown authorization status: {value:?}")]
    InvalidStatus { value: String },

    #[error("Credential store rejected the request (HTTP {status}): {message}")]
    RemoteStore { status: u16, message: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    // ── Identity provider ────────────────────────────────────────────
    #[error("{message} ({code})")]
    Identity { code: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Cancellation is not a failure; callers drop it silently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status behind the error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::RemoteStore { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            message: message.into(),
        }
    }

    /// Re-tag an HTTP failure as a credential-store rejection.
    pub(crate) fn from_store(err: nilo_api::Error) -> Self {
        match err {
            nilo_api::Error::HttpStatus { status, body } => Self::RemoteStore {
                status,
                message: body,
            },
            other => Self::from(other),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nilo_api::Error> for CoreError {
    fn from(err: nilo_api::Error) -> Self {
        match err {
            nilo_api::Error::AuthenticationExhausted { attempts, .. } => {
                Self::AuthenticationExhausted { attempts }
            }
            nilo_api::Error::NetworkExhausted { attempts, reason } => {
                Self::NetworkExhausted { attempts, reason }
            }
            nilo_api::Error::Cancelled => Self::Cancelled,
            nilo_api::Error::HttpStatus { status, body } => Self::HttpStatus {
                status,
                message: body,
            },
            nilo_api::Error::Transport(ref e) => {
                if let Some(status) = e.status() {
                    Self::HttpStatus {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    Self::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            nilo_api::Error::Tls(reason) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            nilo_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            nilo_api::Error::InvalidHeader(message) => Self::Config { message },
            nilo_api::Error::Identity { code, message } => Self::Identity { code, message },
            nilo_api::Error::InvalidToken(message) => {
                Self::Internal(format!("Invalid session token: {message}"))
            }
            nilo_api::Error::UnexpectedResponse(message) => Self::UnexpectedResponse { message },
            nilo_api::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
