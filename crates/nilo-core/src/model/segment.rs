// ── Network segments ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSegment {
    pub id: String,
    pub name: String,
    pub tenant_id: Option<String>,
    pub version: Option<String>,
    pub encrypted: Option<bool>,
    pub setting_status: Option<String>,
    /// Present when the listing included configuration detail.
    pub detail: Option<SegmentDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SegmentDetail {
    pub urls: Vec<String>,
    pub pop_tunnel_enabled: bool,
    pub wired_self_register_enabled: bool,
    pub wired_sso_enabled: bool,
    pub wired_guest_enabled: bool,
    pub geo_scope: GeoScope,
    pub linked_settings: LinkedSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoScope {
    pub site_ids: Vec<String>,
    pub building_ids: Vec<String>,
    pub zone_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedSettings {
    pub global: Vec<Value>,
    pub sites: Vec<LinkedSetting>,
    pub buildings: Vec<LinkedSetting>,
    pub zones: Vec<LinkedSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedSetting {
    pub kind: Option<String>,
    pub id: Option<String>,
    pub location: Option<String>,
}

impl NetworkSegment {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

impl LinkedSettings {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
            && self.sites.is_empty()
            && self.buildings.is_empty()
            && self.zones.is_empty()
    }
}
