//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod account;
pub mod authorize;
pub mod clients;
pub mod config_cmd;
pub mod devices;
pub mod grouped;
pub mod hierarchy;
pub mod keys;
pub mod util;

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nilo_core::{AuthSession, Dashboard};

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Everything a backend-bound command needs.
pub struct Context {
    pub dashboard: Dashboard,
    pub profile: String,
    pub cancel: CancellationToken,
}

type SessionWatch = Option<watch::Receiver<Option<Arc<AuthSession>>>>;

impl Context {
    pub fn new(dashboard: Dashboard, profile: String, cancel: CancellationToken) -> Self {
        Self {
            dashboard,
            profile,
            cancel,
        }
    }

    /// Load the profile's remembered session into the dashboard.
    ///
    /// Returns a receiver that reports whether the session changed later.
    pub fn restore_session(&self) -> SessionWatch {
        let session = self.dashboard.session().ok()?;
        match config::load_session(&self.profile) {
            Ok(Some(tokens)) => {
                if let Err(e) = session.restore(tokens) {
                    warn!(profile = %self.profile, error = %e, "ignoring unreadable stored session");
                }
            }
            Ok(None) => {}
            Err(e) => debug!(profile = %self.profile, error = %e, "no stored session available"),
        }
        Some(session.subscribe())
    }

    /// Write the session back if the command changed it.
    pub fn persist_session(&self, watcher: SessionWatch) {
        let Some(watcher) = watcher else {
            return;
        };
        if !watcher.has_changed().unwrap_or(false) {
            return;
        }
        let result = match watcher.borrow().as_ref() {
            Some(session) => config::save_session(&self.profile, &session.tokens),
            None => config::clear_session(&self.profile),
        };
        if let Err(e) = result {
            warn!(profile = %self.profile, error = %e, "could not store session");
        }
    }
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Tree(args) => hierarchy::tree(ctx, &args, global).await,
        Command::Sites => hierarchy::sites(ctx, global).await,
        Command::Buildings => hierarchy::buildings(ctx, global).await,
        Command::Floors => hierarchy::floors(ctx, global).await,
        Command::Segments(args) => hierarchy::segments(ctx, &args, global).await,
        Command::Devices(args) => devices::handle(ctx, &args, global).await,
        Command::Clients(args) => clients::handle(ctx, &args, global).await,
        Command::Authorize(args) => authorize::handle(ctx, args, global).await,
        Command::Keys(args) => keys::handle(ctx, args, global).await,
        Command::Account(args) => account::handle(ctx, args, global).await,
        Command::Refresh => refresh(ctx, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command needs no backend and was not handled".into(),
        )),
    }
}

async fn refresh(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let message = util::with_spinner(
        global,
        "Resyncing tenant",
        ctx.dashboard.refresh(&ctx.cancel),
    )
    .await?;
    if !global.quiet {
        eprintln!("✓ {}", message.trim());
    }
    Ok(())
}
