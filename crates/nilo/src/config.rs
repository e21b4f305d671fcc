//! CLI configuration -- thin wrapper around `nilo_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --tenant, --api-key, ...).

use secrecy::SecretString;

use nilo_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nilo_config::{
    Config, Profile, clear_session, config_path, load_config_or_default, load_session,
    save_config, save_session, store_api_key,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile with flag overrides applied.
///
/// Without a stored profile, `--api-url` alone is enough to run.
pub fn effective_profile(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<Profile, CliError> {
    let mut profile = match config.profile(profile_name) {
        Ok(p) => p.clone(),
        // An explicitly named profile must exist
        Err(err) if global.profile.is_some() => return Err(err.into()),
        Err(_) => Profile::default(),
    };

    if let Some(url) = &global.api_url {
        profile.api_url.clone_from(url);
    }
    if profile.api_url.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    if let Some(tenant) = &global.tenant {
        profile.tenant_id = Some(tenant.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(profile)
}

/// Translate the active profile + global flags into a `DashboardConfig`.
pub fn resolve_dashboard_config(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<DashboardConfig, CliError> {
    let profile = effective_profile(global, config, profile_name)?;

    // CLI flag takes priority over the profile's own key chain
    let api_key = match &global.api_key {
        Some(key) => Some(SecretString::from(key.clone())),
        None => nilo_config::resolve_api_key(&profile, profile_name),
    };

    Ok(nilo_config::profile_to_dashboard_config(
        &profile,
        &config.defaults,
        api_key,
    )?)
}
