// ── MAB devices and clients ──
//
// The device list and the client list return the same record shape; both
// become `NetworkDevice`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::mac::MacAddress;

/// Authorization state of a MAC address.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum AuthState {
    #[serde(rename = "AUTH_OK")]
    #[strum(to_string = "AUTH_OK", serialize = "OK")]
    Ok,
    #[serde(rename = "AUTH_WAITING_FOR_APPROVAL")]
    #[strum(to_string = "AUTH_WAITING_FOR_APPROVAL", serialize = "WAITING_FOR_APPROVAL")]
    WaitingForApproval,
    #[serde(rename = "AUTH_DENIED")]
    #[strum(to_string = "AUTH_DENIED", serialize = "DENIED")]
    Denied,
    #[default]
    #[serde(rename = "UNKNOWN")]
    #[strum(to_string = "UNKNOWN")]
    Unknown,
}

impl AuthState {
    /// Parse a backend state code; anything unrecognized is `Unknown`.
    pub fn from_code(code: Option<&str>) -> Self {
        code.and_then(|c| c.trim().parse().ok()).unwrap_or_default()
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, Self::WaitingForApproval)
    }
}

/// A network-attached endpoint tracked by MAC address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDevice {
    pub id: String,
    pub mac: MacAddress,
    pub tenant_id: Option<String>,
    pub site_id: Option<String>,
    pub building_id: Option<String>,
    pub floor_id: Option<String>,
    pub zone_id: Option<String>,
    pub segment_id: Option<String>,
    pub device_id: Option<String>,
    pub state: AuthState,
    pub authenticated_by: Option<String>,
    /// Last switch port the device was seen on.
    pub port: Option<String>,
    pub static_ip: Option<String>,
    pub ip_address: Option<String>,
}

impl NetworkDevice {
    /// Static address if assigned, otherwise the learned one.
    pub fn ip(&self) -> Option<&str> {
        self.static_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .or(self.ip_address.as_deref())
    }
}
