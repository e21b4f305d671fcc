//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nilo_config::ConfigError;
use nilo_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(nilo::connection_failed),
        help(
            "Check the API URL and your network connection.\n\
             {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in")]
    #[diagnostic(
        code(nilo::not_signed_in),
        help("Run: nilo account sign-in <username>")
    )]
    NotSignedIn,

    #[error("No stored API key matches '{target}'")]
    #[diagnostic(
        code(nilo::no_credentials),
        help(
            "Store one with: nilo keys create --service {target}\n\
             Or give a key directly with --api-key / NILO_API_KEY."
        )
    )]
    NoCredentials { target: String },

    #[error("The API kept rejecting the key after {attempts} attempts")]
    #[diagnostic(
        code(nilo::auth_failed),
        help(
            "The inventory API key is invalid or expired.\n\
             Update it with: nilo keys update <id> --rotate"
        )
    )]
    AuthFailed { attempts: u32 },

    #[error("{message}")]
    #[diagnostic(code(nilo::identity), help("Identity provider error: {code}"))]
    Identity { code: String, message: String },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(nilo::api_error))]
    ApiError { status: u16, message: String },

    #[error("Credential store error (HTTP {status}): {message}")]
    #[diagnostic(
        code(nilo::key_store),
        help("Run: nilo keys list to see your stored keys")
    )]
    KeyStore { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(nilo::unexpected_response))]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nilo::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nilo::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nilo config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API URL configured")]
    #[diagnostic(
        code(nilo::no_config),
        help(
            "Create a profile with: nilo config init\n\
             Or pass --api-url. Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{message}")]
    #[diagnostic(code(nilo::config))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(nilo::keyring))]
    Keyring(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(nilo::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    /// Interrupted by the user; nothing is printed.
    #[error("Interrupted")]
    Cancelled,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(nilo::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotSignedIn
            | Self::NoCredentials { .. }
            | Self::AuthFailed { .. }
            | Self::Identity { .. } => exit_code::AUTH,
            Self::ApiError { status, .. } | Self::KeyStore { status, .. } => match status {
                401 => exit_code::AUTH,
                403 => exit_code::PERMISSION,
                404 => exit_code::NOT_FOUND,
                409 => exit_code::CONFLICT,
                _ => exit_code::GENERAL,
            },
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Cancelled => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Whether the error should be reported at all.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotAuthenticated => CliError::NotSignedIn,

            CoreError::NoCredentialAvailable { target } => CliError::NoCredentials { target },

            CoreError::AuthenticationExhausted { attempts } => CliError::AuthFailed { attempts },

            CoreError::NetworkExhausted { attempts, reason } => CliError::ConnectionFailed {
                url: "the API".into(),
                reason: format!("gave up after {attempts} attempts: {reason}"),
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::HttpStatus { status, message } => CliError::ApiError { status, message },

            CoreError::RemoteStore { status, message } => CliError::KeyStore { status, message },

            CoreError::UnexpectedResponse { message } => CliError::UnexpectedResponse { message },

            CoreError::Cancelled => CliError::Cancelled,

            CoreError::InvalidStatus { value } => CliError::Validation {
                field: "status".into(),
                reason: format!("'{value}' is not one of Approved, Denied"),
            },

            CoreError::Validation { field, message } => CliError::Validation {
                field,
                reason: message,
            },

            CoreError::MissingField { field } => CliError::Validation {
                field,
                reason: "required field is missing".into(),
            },

            CoreError::Identity { code, message } => CliError::Identity { code, message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Keyring(_) | ConfigError::Session(_)) => {
                CliError::Keyring(Box::new(other))
            }
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
