use thiserror::Error;

/// Top-level error type for the `nilo-api` crate.
///
/// Covers every failure mode across the three remote surfaces:
/// the inventory API, the credential store backend, and the identity provider.
/// `nilo-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Retry exhaustion ────────────────────────────────────────────
    /// Every attempt was rejected with a retryable status (401, and 400 by default).
    #[error("Authentication kept failing after {attempts} attempts (last status {last_status})")]
    AuthenticationExhausted { attempts: u32, last_status: u16 },

    /// Every attempt failed at the network level (connection reset, DNS, ...).
    #[error("Network kept failing after {attempts} attempts: {reason}")]
    NetworkExhausted { attempts: u32, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The in-flight request was cancelled by its owner. Not a failure.
    #[error("Request cancelled")]
    Cancelled,

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-2xx response that is not retried.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The response was 2xx but did not honour the documented contract.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    // ── Identity provider ───────────────────────────────────────────
    /// Structured error from the identity provider (`__type` + `message`).
    #[error("Identity provider error ({code}): {message}")]
    Identity { code: String, message: String },

    /// A session token could not be decoded.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// An API key contained characters that cannot be sent as a header.
    #[error("Invalid credential header value: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Returns `true` if the owner of the request cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this error indicates the credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationExhausted { .. } | Self::HttpStatus { status: 401 | 403, .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::AuthenticationExhausted { last_status, .. } => Some(*last_status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Trim a response body to a short preview for error messages and logs.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
