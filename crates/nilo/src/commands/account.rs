//! Account handlers: registration, sign-in and the signed-in user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use nilo_core::{AuthSession, UserAttribute};

use crate::cli::{AccountArgs, AccountCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Whoami view ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct Whoami<'a> {
    principal_id: Option<&'a str>,
    email: Option<&'a str>,
    name: Option<&'a str>,
    expires_at: DateTime<Utc>,
}

impl<'a> From<&'a AuthSession> for Whoami<'a> {
    fn from(s: &'a AuthSession) -> Self {
        Self {
            principal_id: s.principal_id(),
            email: s.email(),
            name: s.display_name(),
            expires_at: s.tokens.expires_at(),
        }
    }
}

fn whoami_detail(w: &Whoami<'_>) -> String {
    let row = |label: &str, value: Option<&str>| format!("{label:<10}{}", value.unwrap_or("-"));
    let expires = w.expires_at.to_rfc3339();
    [
        row("User:", w.principal_id),
        row("Email:", w.email),
        row("Name:", w.name),
        row("Expires:", Some(expires.as_str())),
    ]
    .join("\n")
}

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&UserAttribute> for AttributeRow {
    fn from(a: &UserAttribute) -> Self {
        Self {
            name: a.name.clone(),
            value: a.value.clone(),
        }
    }
}

fn sign_up_attributes(email: Option<String>, name: Option<String>) -> Vec<UserAttribute> {
    [("email", email), ("name", name)]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| UserAttribute::new(key, v)))
        .collect()
}

fn done(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("✓ {message}");
    }
}

/// Prompt twice and require both entries to match.
fn prompt_new_password(label: &str) -> Result<secrecy::SecretString, CliError> {
    use secrecy::ExposeSecret;

    let first = util::prompt_secret(&format!("{label}: "), "password")?;
    let again = util::prompt_secret(&format!("Repeat {}: ", label.to_lowercase()), "password")?;
    if first.expose_secret() != again.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    Ok(first)
}

pub async fn handle(ctx: &Context, args: AccountArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = ctx.dashboard.session()?;
    let cancel = &ctx.cancel;

    match args.command {
        AccountCommand::SignUp {
            username,
            email,
            name,
        } => {
            let password = prompt_new_password("Password")?;
            let attributes = sign_up_attributes(email, name);
            let outcome = session
                .sign_up(&username, &password, &attributes, cancel)
                .await?;
            if outcome.confirmed {
                done(global, &format!("registered {username}"));
            } else {
                let destination = outcome
                    .delivery
                    .as_ref()
                    .and_then(|d| d.destination.as_deref())
                    .unwrap_or("your email");
                done(
                    global,
                    &format!("registered {username}; a confirmation code was sent to {destination}"),
                );
            }
            Ok(())
        }

        AccountCommand::Confirm { username, code } => {
            session
                .confirm_registration(&username, code.trim(), cancel)
                .await?;
            done(global, &format!("confirmed {username}"));
            Ok(())
        }

        AccountCommand::SignIn { username } => {
            let password = util::prompt_secret("Password: ", "password")?;
            let signed_in = util::with_spinner(
                global,
                "Signing in",
                session.sign_in(&username, &password, cancel),
            )
            .await?;
            let who = signed_in
                .email()
                .or(signed_in.principal_id())
                .unwrap_or(username.as_str())
                .to_owned();
            done(global, &format!("signed in as {who}"));
            Ok(())
        }

        AccountCommand::SignOut => {
            session.sign_out(cancel).await?;
            done(global, "signed out");
            Ok(())
        }

        AccountCommand::Whoami => {
            let current = session.current().ok_or(CliError::NotSignedIn)?;
            let view = Whoami::from(current.as_ref());
            let out = output::render_single(global.output, &view, whoami_detail, |w| {
                w.principal_id.unwrap_or_default().to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::Attributes => {
            let user = util::with_spinner(global, "Loading account", session.user(cancel)).await?;
            let out = output::render_list(
                global.output,
                &user.attributes,
                |a| AttributeRow::from(a),
                |a| format!("{}={}", a.name, a.value),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::SetAttribute { name, value } => {
            let attribute = UserAttribute::new(name.trim(), value);
            session
                .update_attributes(std::slice::from_ref(&attribute), cancel)
                .await?;
            done(global, &format!("updated {}", attribute.name));
            Ok(())
        }

        AccountCommand::ChangePassword => {
            let old = util::prompt_secret("Current password: ", "password")?;
            let new = prompt_new_password("New password")?;
            session.change_password(&old, &new, cancel).await?;
            done(global, "password changed");
            Ok(())
        }

        AccountCommand::ForgotPassword { username } => {
            let delivery = session.forgot_password(&username, cancel).await?;
            let destination = delivery.destination.as_deref().unwrap_or("your email");
            done(global, &format!("reset code sent to {destination}"));
            Ok(())
        }

        AccountCommand::ConfirmForgotPassword { username, code } => {
            let new = prompt_new_password("New password")?;
            session
                .confirm_forgot_password(&username, code.trim(), &new, cancel)
                .await?;
            done(global, "password reset");
            Ok(())
        }
    }
}
