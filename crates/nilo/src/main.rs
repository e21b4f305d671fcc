mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use nilo_core::Dashboard;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    // Ctrl-C cancels whatever is in flight; the cancelled command exits quietly
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if let Err(err) = run(cli, cancel).await {
        let code = err.exit_code();
        if !err.is_silent() {
            eprintln!("{:?}", miette::Report::new(err));
        }
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "nilo", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load_config_or_default();
            let profile = config::active_profile_name(&cli.global, &cfg);
            let dashboard_config = config::resolve_dashboard_config(&cli.global, &cfg, &profile)?;
            let dashboard = Dashboard::new(dashboard_config)?;

            let ctx = Context::new(dashboard, profile, cancel);
            let watcher = ctx.restore_session();

            tracing::debug!(command = ?cmd, profile = %ctx.profile, "dispatching command");
            let result = commands::dispatch(cmd, &ctx, &cli.global).await;

            // Sign-in, sign-out and token refreshes all outlive this process
            ctx.persist_session(watcher);
            result
        }
    }
}
