//! Approve / deny handler.

use nilo_core::AuthorizeForm;
use nilo_core::authorize::{DESCRIPTION_FIELD, SEGMENT_FIELD, STATUS_FIELD};

use crate::cli::{AuthorizeArgs, GlobalOpts};
use crate::error::CliError;

use super::{Context, util};

fn fill(args: AuthorizeArgs) -> AuthorizeForm {
    let mut form = AuthorizeForm::new(Some(&args.id), Some(&args.mac));
    let fields = form.form_mut();
    fields.set_field_value(STATUS_FIELD, args.status);
    fields.set_field_value(SEGMENT_FIELD, args.segment);
    if let Some(description) = args.description {
        fields.set_field_value(DESCRIPTION_FIELD, description);
    }
    form
}

pub async fn handle(ctx: &Context, args: AuthorizeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let status = args.status.clone();
    let mut form = fill(args);

    let submit = ctx.dashboard.authorize(&mut form, &ctx.cancel);
    match util::with_spinner(global, "Submitting decision", submit).await {
        Ok(mac) => {
            if !global.quiet {
                eprintln!("✓ {mac} {}", status.trim().to_lowercase());
            }
            Ok(())
        }
        Err(err) => {
            // The returned error is the first problem; list any others too
            let errors = form.form().errors();
            if errors.len() > 1 {
                for (field, message) in errors.iter().skip(1) {
                    eprintln!("  {field}: {message}");
                }
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nilo_core::CoreError;

    use super::*;

    fn args(status: &str, segment: &str) -> AuthorizeArgs {
        AuthorizeArgs {
            id: "c1".into(),
            mac: "AA:BB:CC:DD:EE:FF".into(),
            status: status.into(),
            segment: segment.into(),
            description: None,
        }
    }

    #[test]
    fn flags_fill_the_form() {
        let mut form = fill(args("approved", "seg-1"));
        let request = form.prepare().unwrap();
        assert_eq!(request.segment_id, "seg-1");
        assert_eq!(request.to_update().description, "Updated via MAB Onboarding API");
    }

    #[test]
    fn unknown_status_fails_before_sending() {
        let mut form = fill(args("Maybe", "seg-1"));
        assert!(matches!(form.prepare().unwrap_err(), CoreError::InvalidStatus { .. }));
    }
}
