// ── Device authorization (MAB) ──
//
// Turns an approve/deny choice, a target segment and a description into
// one state-transition request. Every precondition is checked before
// the request is built; nothing reaches the network on a bad form.

use std::fmt;

use nilo_api::InventoryClient;
use nilo_api::inventory::models::MacStateUpdate;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::form::{FORM_ERROR_KEY, FormState};
use crate::model::{AuthState, MacAddress};

/// Unselected status dropdown.
pub const STATUS_PLACEHOLDER: &str = "Status";

/// Unselected segment dropdown.
pub const SEGMENT_PLACEHOLDER: &str = "Select Segment";

/// Sent when the user leaves the description empty.
pub const DEFAULT_DESCRIPTION: &str = "Updated via MAB Onboarding API";

pub const STATUS_FIELD: &str = "status";
pub const SEGMENT_FIELD: &str = "segment";
pub const DESCRIPTION_FIELD: &str = "description";
pub const DEVICE_FIELD: &str = "device";

// ── Status vocabulary ───────────────────────────────────────────────

/// The two decisions a user can make about a waiting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChoice {
    Approved,
    Denied,
}

impl StatusChoice {
    /// Map a UI label to a decision. Labels match ignoring ASCII case;
    /// anything else is an [`CoreError::InvalidStatus`].
    pub fn parse(label: &str) -> Result<Self, CoreError> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("Approved") {
            Ok(Self::Approved)
        } else if label.eq_ignore_ascii_case("Denied") {
            Ok(Self::Denied)
        } else {
            Err(CoreError::InvalidStatus {
                value: label.to_owned(),
            })
        }
    }

    /// Backend state code for this decision.
    pub fn state(self) -> AuthState {
        match self {
            Self::Approved => AuthState::Ok,
            Self::Denied => AuthState::Denied,
        }
    }
}

impl fmt::Display for StatusChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "Approved",
            Self::Denied => "Denied",
        })
    }
}

// ── Request ─────────────────────────────────────────────────────────

/// A fully validated authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub mac: MacAddress,
    pub status: StatusChoice,
    pub segment_id: String,
    pub description: String,
}

impl AuthorizationRequest {
    /// Wire payload entry.
    pub fn to_update(&self) -> MacStateUpdate {
        let description = match self.description.trim() {
            "" => DEFAULT_DESCRIPTION.to_owned(),
            d => d.to_owned(),
        };
        MacStateUpdate {
            id: format!("{}-{}", self.client_id, self.mac),
            mac_address: self.mac.as_str().to_owned(),
            segment_id: self.segment_id.clone(),
            state: self.status.state().to_string(),
            description,
        }
    }
}

/// Send one decision.
pub async fn authorize_device(
    client: &InventoryClient,
    request: &AuthorizationRequest,
    cancel: &CancellationToken,
) -> Result<Value, CoreError> {
    info!(
        client_id = %request.client_id,
        mac = %request.mac,
        status = %request.status,
        segment = %request.segment_id,
        "authorizing device"
    );
    Ok(client.update_mac_state(request.to_update(), cancel).await?)
}

// ── Form ────────────────────────────────────────────────────────────

/// The authorization form for one device.
///
/// The device id and MAC come from where the user navigated from; the
/// three fields are edited through [`form_mut`](Self::form_mut).
#[derive(Debug)]
pub struct AuthorizeForm {
    client_id: Option<String>,
    mac: Option<String>,
    form: FormState,
}

impl AuthorizeForm {
    pub fn new(client_id: Option<&str>, mac: Option<&str>) -> Self {
        let present = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned);
        Self {
            client_id: present(client_id),
            mac: present(mac),
            form: FormState::new([
                (STATUS_FIELD, STATUS_PLACEHOLDER),
                (SEGMENT_FIELD, SEGMENT_PLACEHOLDER),
                (DESCRIPTION_FIELD, ""),
            ]),
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Check every precondition and record field errors.
    ///
    /// Returns the first problem found; the form holds all of them.
    pub fn prepare(&mut self) -> Result<AuthorizationRequest, CoreError> {
        let mut first: Option<CoreError> = None;
        let mut fail = |form: &mut FormState, field: &str, err: CoreError| {
            form.set_field_error(field, err.to_string());
            first.get_or_insert(err);
        };

        if self.client_id.is_none() || self.mac.is_none() {
            fail(
                &mut self.form,
                DEVICE_FIELD,
                CoreError::validation(DEVICE_FIELD, "device id and MAC address are required"),
            );
        }

        let label = self.form.value(STATUS_FIELD).unwrap_or_default().trim().to_owned();
        let status = if label.is_empty() || label == STATUS_PLACEHOLDER {
            fail(
                &mut self.form,
                STATUS_FIELD,
                CoreError::validation(STATUS_FIELD, "choose Approved or Denied"),
            );
            None
        } else {
            match StatusChoice::parse(&label) {
                Ok(status) => Some(status),
                Err(err) => {
                    fail(&mut self.form, FORM_ERROR_KEY, err);
                    None
                }
            }
        };

        let segment = self.form.value(SEGMENT_FIELD).unwrap_or_default().trim().to_owned();
        if segment.is_empty() || segment == SEGMENT_PLACEHOLDER {
            fail(
                &mut self.form,
                SEGMENT_FIELD,
                CoreError::validation(SEGMENT_FIELD, "choose a segment"),
            );
        }

        if let Some(err) = first {
            return Err(err);
        }

        match (&self.client_id, &self.mac, status) {
            (Some(client_id), Some(mac), Some(status)) => Ok(AuthorizationRequest {
                client_id: client_id.clone(),
                mac: MacAddress::new(mac),
                status,
                segment_id: segment,
                description: self
                    .form
                    .value(DESCRIPTION_FIELD)
                    .unwrap_or_default()
                    .to_owned(),
            }),
            _ => Err(CoreError::Internal("authorization form left incomplete".into())),
        }
    }

    /// Validate and send. A failed request is recorded under
    /// [`FORM_ERROR_KEY`]; cancellation records nothing.
    ///
    /// On success returns the MAC that changed, for the caller's
    /// confirmation message.
    pub async fn submit(
        &mut self,
        client: &InventoryClient,
        cancel: &CancellationToken,
    ) -> Result<MacAddress, CoreError> {
        let request = self.prepare()?;
        let result = self
            .form
            .submit(authorize_device(client, &request, cancel))
            .await;

        match result {
            Ok(_) => Ok(request.mac),
            Err(err) => {
                if !err.is_cancelled() {
                    warn!(mac = %request.mac, error = %err, "authorization failed");
                    self.form.set_field_error(FORM_ERROR_KEY, err.to_string());
                }
                Err(err)
            }
        }
    }
}
