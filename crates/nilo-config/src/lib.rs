//! Shared configuration for the Nile dashboard CLI.
//!
//! TOML profiles, API-key resolution (env + keyring + plaintext), the
//! persisted identity-provider session, and translation to
//! `nilo_core::DashboardConfig`. The CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use nilo_core::{
    DashboardConfig, FloorExpansion, IdentityConfig, SessionTokens, TlsVerification,
};

/// Keyring service every secret is filed under.
pub const KEYRING_SERVICE: &str = "nilo";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("stored session is unreadable: {0}")]
    Session(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// One tenant's connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Inventory / authorization API base URL.
    pub api_url: String,

    /// Backend hosting the credential store. Defaults to `api_url`.
    pub store_url: Option<String>,

    /// Identity-provider endpoint for sign-in.
    pub identity_endpoint: Option<String>,

    /// App client id registered with the identity provider.
    pub client_id: Option<String>,

    pub tenant_id: Option<String>,

    /// Inventory API key (plaintext -- prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable holding the inventory API key.
    pub api_key_env: Option<String>,

    /// Service label matched against stored keys. Defaults to "Nile".
    pub credential_target: Option<String>,

    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,

    /// Start floor groups expanded in the device tree.
    pub expand_device_floors: Option<bool>,

    /// Start floor groups expanded in the client tree.
    pub expand_client_floors: Option<bool>,

    /// Client-list page size.
    pub page_size: Option<u32>,
}

impl Profile {
    /// Keys accepted by [`Profile::set`].
    pub const KEYS: &'static [&'static str] = &[
        "api_url",
        "store_url",
        "identity_endpoint",
        "client_id",
        "tenant_id",
        "api_key",
        "api_key_env",
        "credential_target",
        "ca_cert",
        "insecure",
        "timeout",
        "expand_device_floors",
        "expand_client_floors",
        "page_size",
    ];

    /// Assign one field from its string form. Dashes and underscores are
    /// interchangeable in `key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parse_bool = |field: &str| {
            value.parse::<bool>().map_err(|_| ConfigError::Validation {
                field: field.into(),
                reason: "must be 'true' or 'false'".into(),
            })
        };
        let parse_num = |field: &str| {
            value.parse::<u64>().map_err(|_| ConfigError::Validation {
                field: field.into(),
                reason: "must be a positive number".into(),
            })
        };

        match key.replace('-', "_").as_str() {
            "api_url" => {
                parse_url("api_url", value)?;
                self.api_url = value.into();
            }
            "store_url" => {
                parse_url("store_url", value)?;
                self.store_url = Some(value.into());
            }
            "identity_endpoint" => {
                parse_url("identity_endpoint", value)?;
                self.identity_endpoint = Some(value.into());
            }
            "client_id" => self.client_id = Some(value.into()),
            "tenant_id" => self.tenant_id = Some(value.into()),
            "api_key" => self.api_key = Some(value.into()),
            "api_key_env" => self.api_key_env = Some(value.into()),
            "credential_target" => self.credential_target = Some(value.into()),
            "ca_cert" => self.ca_cert = Some(value.into()),
            "insecure" => self.insecure = Some(parse_bool("insecure")?),
            "timeout" => self.timeout = Some(parse_num("timeout")?),
            "expand_device_floors" => {
                self.expand_device_floors = Some(parse_bool("expand_device_floors")?);
            }
            "expand_client_floors" => {
                self.expand_client_floors = Some(parse_bool("expand_client_floors")?);
            }
            "page_size" => {
                let size = u32::try_from(parse_num("page_size")?)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::Validation {
                        field: "page_size".into(),
                        reason: "must be between 1 and 4294967295".into(),
                    })?;
                self.page_size = Some(size);
            }
            other => {
                return Err(ConfigError::Validation {
                    field: other.into(),
                    reason: format!("unknown key. Valid keys: {}", Self::KEYS.join(", ")),
                });
            }
        }
        Ok(())
    }
}

fn parse_url(field: &str, value: &str) -> Result<url::Url, ConfigError> {
    value.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })
}

// ── Config file path ─────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "nilo", "nilo")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        })
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nilo");
    p
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full config from the default path and environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then `NILO_` variables (`NILO_DEFAULTS__OUTPUT=json`,
/// `NILO_PROFILES__HOME__TENANT_ID=...`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NILO_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ──────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, slot: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{slot}"),
    )?)
}

/// Store the profile's inventory API key in the system keyring.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "api-key")?.set_password(key.expose_secret())?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an explicit inventory API key: env var named by the profile,
/// then keyring, then plaintext.
///
/// `None` is not an error: the dashboard then picks a key from the
/// signed-in user's stored credentials.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(val) = profile
        .api_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
    {
        return Some(SecretString::from(val));
    }

    if let Ok(secret) = keyring_entry(profile_name, "api-key")
        .and_then(|e| e.get_password().map_err(ConfigError::from))
    {
        return Some(SecretString::from(secret));
    }

    profile
        .api_key
        .as_ref()
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.clone()))
}

// ── Persisted session ───────────────────────────────────────────────

/// Identity-provider tokens as kept between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id_token: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

impl From<&SessionTokens> for StoredSession {
    fn from(tokens: &SessionTokens) -> Self {
        Self {
            id_token: tokens.id_token.expose_secret().to_owned(),
            access_token: tokens.access_token.expose_secret().to_owned(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            expires_in: tokens.expires_in,
            issued_at: tokens.issued_at,
        }
    }
}

impl From<StoredSession> for SessionTokens {
    fn from(stored: StoredSession) -> Self {
        Self {
            id_token: SecretString::from(stored.id_token),
            access_token: SecretString::from(stored.access_token),
            refresh_token: stored.refresh_token.map(SecretString::from),
            expires_in: stored.expires_in,
            issued_at: stored.issued_at,
        }
    }
}

pub fn save_session(profile_name: &str, tokens: &SessionTokens) -> Result<(), ConfigError> {
    let json = serde_json::to_string(&StoredSession::from(tokens))?;
    keyring_entry(profile_name, "session")?.set_password(&json)?;
    debug!(profile = profile_name, "session persisted");
    Ok(())
}

/// The persisted session, if one exists.
pub fn load_session(profile_name: &str) -> Result<Option<SessionTokens>, ConfigError> {
    match keyring_entry(profile_name, "session")?.get_password() {
        Ok(json) => {
            let stored: StoredSession = serde_json::from_str(&json)?;
            Ok(Some(stored.into()))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn clear_session(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name, "session")?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Profile → DashboardConfig ───────────────────────────────────────

/// Translate a profile into the runtime configuration.
///
/// `api_key` is the already-resolved explicit key, if any.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    defaults: &Defaults,
    api_key: Option<SecretString>,
) -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::new(parse_url("api_url", &profile.api_url)?);

    config.store_url = profile
        .store_url
        .as_deref()
        .map(|u| parse_url("store_url", u))
        .transpose()?;

    config.identity = match (&profile.identity_endpoint, &profile.client_id) {
        (Some(endpoint), Some(client_id)) => Some(IdentityConfig {
            endpoint: parse_url("identity_endpoint", endpoint)?,
            client_id: client_id.clone(),
        }),
        (Some(_), None) => {
            return Err(ConfigError::Validation {
                field: "client_id".into(),
                reason: "required when identity_endpoint is set".into(),
            });
        }
        _ => None,
    };

    config.tenant_id = profile.tenant_id.clone().filter(|t| !t.is_empty());
    config.api_key = api_key;
    if let Some(target) = profile.credential_target.as_ref().filter(|t| !t.is_empty()) {
        config.credential_target.clone_from(target);
    }

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    let floors = FloorExpansion::default();
    config.floor_expansion = FloorExpansion {
        devices: profile.expand_device_floors.unwrap_or(floors.devices),
        clients: profile.expand_client_floors.unwrap_or(floors.clients),
    };
    if let Some(size) = profile.page_size {
        config.client_page_size = size;
    }

    Ok(config)
}
