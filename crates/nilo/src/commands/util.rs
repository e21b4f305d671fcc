//! Shared helpers for command handlers.

use std::future::Future;
use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Run `fut` behind a stderr spinner when a person is watching.
pub async fn with_spinner<F: Future>(global: &GlobalOpts, message: &str, fut: F) -> F::Output {
    if global.quiet || !std::io::stderr().is_terminal() {
        return fut.await;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    let out = fut.await;
    bar.finish_and_clear();
    out
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for a secret without echo; empty input is rejected.
pub fn prompt_secret(label: &str, field: &str) -> Result<SecretString, CliError> {
    let value = rpassword::prompt_password(label).map_err(prompt_err)?;
    non_empty_secret(value, field)
}

/// Read a secret from stdin, trimming the trailing newline.
pub fn read_secret_stdin(field: &str) -> Result<SecretString, CliError> {
    let mut value = String::new();
    std::io::stdin().read_to_string(&mut value)?;
    non_empty_secret(value.trim_end_matches(['\r', '\n']).to_owned(), field)
}

fn non_empty_secret(value: String, field: &str) -> Result<SecretString, CliError> {
    if value.trim().is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(value))
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// `-` for absent values in tables.
pub fn dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| "-".into(), str::to_owned)
}
