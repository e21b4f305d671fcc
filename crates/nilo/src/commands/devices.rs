//! Device tree handler.

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, grouped, util};

pub async fn handle(
    ctx: &Context,
    args: &DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let message = if args.waiting {
        "Loading devices awaiting approval"
    } else {
        "Loading devices"
    };
    let fetch = ctx.dashboard.device_tree(args.waiting, &ctx.cancel);
    let mut tree = util::with_spinner(global, message, fetch).await?;

    grouped::apply_floor_override(
        &mut tree,
        grouped::floor_override(args.expand_floors, args.collapse_floors),
    );
    let out = grouped::render(&tree, "devices", global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
