//! Client tree handler.

use chrono::{DateTime, Utc};

use nilo_core::ClientWindow;

use crate::cli::{ClientsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, grouped, util};

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CliError::Validation {
            field: field.into(),
            reason: format!("expected an RFC 3339 timestamp like 2024-05-01T00:00:00Z: {e}"),
        })
}

/// The requested window; an open start means the 24 hours before `end`.
fn window(
    args: &ClientsArgs,
    default_page_size: u32,
    now: DateTime<Utc>,
) -> Result<ClientWindow, CliError> {
    let end = args
        .end
        .as_deref()
        .map(|v| parse_time("end", v))
        .transpose()?
        .unwrap_or(now);
    let page_size = args.page_size.unwrap_or(default_page_size);

    let mut window = ClientWindow::last_day(end, page_size);
    if let Some(start) = args.start.as_deref() {
        window.start = parse_time("start", start)?;
    }
    if window.start >= window.end {
        return Err(CliError::Validation {
            field: "start".into(),
            reason: "must be earlier than end".into(),
        });
    }

    Ok(if args.all {
        window.all_pages()
    } else {
        ClientWindow {
            page: Some(args.page),
            ..window
        }
    })
}

pub async fn handle(
    ctx: &Context,
    args: &ClientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let default_page_size = ctx.dashboard.config().client_page_size;
    let window = window(args, default_page_size, Utc::now())?;
    tracing::debug!(
        start = %window.start,
        end = %window.end,
        page = ?window.page,
        page_size = window.page_size,
        "client window"
    );

    let message = if window.page.is_none() {
        "Loading every client page"
    } else {
        "Loading clients"
    };
    let fetch = ctx.dashboard.client_tree(&window, &ctx.cancel);
    let mut tree = util::with_spinner(global, message, fetch).await?;

    grouped::apply_floor_override(
        &mut tree,
        grouped::floor_override(args.expand_floors, args.collapse_floors),
    );
    let out = grouped::render(&tree, "clients", global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn args() -> ClientsArgs {
        ClientsArgs {
            page: 1,
            page_size: None,
            start: None,
            end: None,
            all: false,
            expand_floors: false,
            collapse_floors: false,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn default_window_is_the_last_day() {
        let w = window(&args(), 100, now()).unwrap();
        assert_eq!(w.end, now());
        assert_eq!(w.end - w.start, Duration::hours(24));
        assert_eq!(w.page, Some(1));
        assert_eq!(w.page_size, 100);
    }

    #[test]
    fn explicit_bounds_and_page_are_kept() {
        let mut a = args();
        a.start = Some("2024-05-01T00:00:00Z".into());
        a.end = Some("2024-05-01T06:00:00+02:00".into());
        a.page = 3;
        a.page_size = Some(20);
        let w = window(&a, 100, now()).unwrap();
        assert_eq!(w.end - w.start, Duration::hours(4));
        assert_eq!(w.page, Some(3));
        assert_eq!(w.page_size, 20);
    }

    #[test]
    fn all_pages_drops_the_page_number() {
        let mut a = args();
        a.all = true;
        assert_eq!(window(&a, 100, now()).unwrap().page, None);
    }

    #[test]
    fn inverted_or_garbled_bounds_are_rejected() {
        let mut a = args();
        a.start = Some("2024-05-03T00:00:00Z".into());
        assert!(matches!(
            window(&a, 100, now()).unwrap_err(),
            CliError::Validation { ref field, .. } if field == "start"
        ));

        a.start = Some("yesterday".into());
        assert!(window(&a, 100, now()).is_err());
    }
}
