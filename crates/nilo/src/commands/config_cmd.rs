//! Config subcommand handlers.

use std::fmt::Write;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::{self, prompt_err};

// ── Helpers ─────────────────────────────────────────────────────────

/// A copy of the config that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some("****".into());
        }
    }
    cfg
}

/// TOML-like rendering of the config, profiles sorted by name.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(default) = &cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for name in cfg.profile_names() {
        let p = &cfg.profiles[&name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        let strings = [
            ("store_url", &p.store_url),
            ("identity_endpoint", &p.identity_endpoint),
            ("client_id", &p.client_id),
            ("tenant_id", &p.tenant_id),
            ("api_key", &p.api_key),
            ("api_key_env", &p.api_key_env),
            ("credential_target", &p.credential_target),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                let _ = writeln!(out, "{key} = \"{value}\"");
            }
        }
        if let Some(ca) = &p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(expand) = p.expand_device_floors {
            let _ = writeln!(out, "expand_device_floors = {expand}");
        }
        if let Some(expand) = p.expand_client_floors {
            let _ = writeln!(out, "expand_client_floors = {expand}");
        }
        if let Some(size) = p.page_size {
            let _ = writeln!(out, "page_size = {size}");
        }
    }

    out.trim_end().to_owned()
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

fn optional(input: String) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn prompt_optional(prompt: &str) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    Ok(optional(value))
}

/// Where the inventory API key comes from.
///
/// Returns the plaintext value when the user chose to keep it in the file.
fn prompt_api_key(profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Use keys stored for my account (sign in later)",
        "Store a key in the system keyring",
        "Save a key to the config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Inventory API key")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => Ok(None),
        1 => {
            let key = util::prompt_secret("API key: ", "api_key")?;
            config::store_api_key(profile_name, &key)?;
            eprintln!("   ✓ API key stored in system keyring");
            Ok(None)
        }
        _ => {
            let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
            Ok(Some(key).filter(|k| !k.trim().is_empty()))
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("nilo configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("Inventory API URL")
                .validate_with(|v: &String| -> Result<(), String> {
                    url::Url::parse(v.trim())
                        .map(|_| ())
                        .map_err(|e| format!("not a valid URL: {e}"))
                })
                .interact_text()
                .map_err(prompt_err)?;

            let tenant_id = prompt_optional("Tenant id (blank to skip)")?;
            let identity_endpoint = prompt_optional("Identity provider endpoint (blank to skip)")?;
            let client_id = match identity_endpoint {
                Some(_) => Some(
                    Input::<String>::new()
                        .with_prompt("Identity client id")
                        .interact_text()
                        .map_err(prompt_err)?,
                ),
                None => None,
            };
            let api_key = prompt_api_key(&profile_name)?;

            let mut profile = Profile {
                tenant_id,
                identity_endpoint,
                client_id,
                api_key,
                ..Profile::default()
            };
            profile.set("api_url", api_url.trim())?;

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: nilo sites");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profiles
                .entry(profile_name.clone())
                .or_default()
                .set(&key, &value)?;
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: nilo config init");
            } else {
                for name in cfg.profile_names() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profile(&profile_name)?;

            let key: SecretString = util::prompt_secret("API key: ", "api_key")?;
            config::store_api_key(&profile_name, &key)?;
            if !global.quiet {
                eprintln!("✓ API key for '{profile_name}' stored in system keyring");
            }
            Ok(())
        }
    }
}
