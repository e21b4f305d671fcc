// ── API-to-domain conversions ──
//
// The one place raw `nilo_api` records become domain types. Shape
// variance (serialized addresses, numeric floor numbers, missing names)
// is resolved here and nowhere else.

use nilo_api::inventory::models::{
    AddressField, RawAddress, RawBuilding, RawDevice, RawFloor, RawLinkedSetting, RawSegment,
    RawSite, Scalar,
};
use nilo_api::keystore::models::ApiKeyRecord;
use secrecy::SecretString;
use tracing::warn;

use crate::model::{
    Address, ApiKeyCredential, AuthState, Building, Floor, GeoScope, LinkedSetting,
    LinkedSettings, MacAddress, NetworkDevice, NetworkSegment, SegmentDetail, Site,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Drop blank strings so "absent" has one spelling.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn scalar_text(value: Option<Scalar>) -> Option<String> {
    non_blank(value.map(Scalar::into_text))
}

fn scalar_f64(value: Option<Scalar>) -> Option<f64> {
    match value? {
        Scalar::Number(n) => n.as_f64(),
        Scalar::Text(s) => s.trim().parse().ok(),
    }
}

// ── Address ─────────────────────────────────────────────────────────

impl From<RawAddress> for Address {
    fn from(raw: RawAddress) -> Self {
        Self {
            street: non_blank(raw.street),
            city: non_blank(raw.city),
            state: non_blank(raw.state),
            zip: non_blank(raw.zip),
            country: non_blank(raw.country),
            latitude: scalar_f64(raw.lat),
            longitude: scalar_f64(raw.lng),
            timezone_id: non_blank(raw.timezone_id),
        }
    }
}

impl Address {
    /// Normalize an address field. A serialized address that fails to
    /// parse yields an empty address rather than an error.
    pub fn from_field(field: Option<AddressField>) -> Self {
        match field {
            None => Self::default(),
            Some(AddressField::Structured(raw)) => raw.into(),
            Some(AddressField::Serialized(text)) if text.trim().is_empty() => Self::default(),
            Some(AddressField::Serialized(text)) => {
                match serde_json::from_str::<RawAddress>(&text) {
                    Ok(raw) => raw.into(),
                    Err(e) => {
                        warn!(error = %e, "unparseable address string, using empty address");
                        Self::default()
                    }
                }
            }
        }
    }
}

// ── Hierarchy ───────────────────────────────────────────────────────

impl From<RawFloor> for Floor {
    fn from(raw: RawFloor) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            building_id: non_blank(raw.building_id),
            site_id: non_blank(raw.site_id),
            name: raw.name.unwrap_or_default(),
            number: scalar_text(raw.number),
            site_name: non_blank(raw.site_name),
            building_name: non_blank(raw.building_name),
        }
    }
}

impl From<RawBuilding> for Building {
    fn from(raw: RawBuilding) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            site_id: non_blank(raw.site_id),
            name: raw.name.unwrap_or_default(),
            address: Address::from_field(raw.address),
            floors: raw.floors.into_iter().map(Floor::from).collect(),
        }
    }
}

impl From<RawSite> for Site {
    fn from(raw: RawSite) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            tenant_id: non_blank(raw.tenant_id),
            name: raw.name.unwrap_or_default(),
            description: non_blank(raw.description),
            address: Address::from_field(raw.address),
            buildings: raw.buildings.into_iter().map(Building::from).collect(),
        }
    }
}

// ── Segments ────────────────────────────────────────────────────────

fn linked(settings: Vec<RawLinkedSetting>) -> Vec<LinkedSetting> {
    settings
        .into_iter()
        .map(|s| LinkedSetting {
            kind: s.kind,
            id: s.id,
            location: s.location,
        })
        .collect()
}

impl From<RawSegment> for NetworkSegment {
    fn from(raw: RawSegment) -> Self {
        let has_detail =
            raw.segment.is_some() || raw.geo_scope.is_some() || raw.linked_settings.is_some();

        let detail = has_detail.then(|| {
            let info = raw.segment.clone().unwrap_or_default();
            let scope = raw.geo_scope.clone().unwrap_or_default();
            let settings = raw.linked_settings.clone().unwrap_or_default();
            SegmentDetail {
                urls: info.urls,
                pop_tunnel_enabled: info.pop_tunnel_enabled,
                wired_self_register_enabled: info.wired_self_register_enabled,
                wired_sso_enabled: info.wired_sso_enabled,
                wired_guest_enabled: info.wired_guest_enabled,
                geo_scope: GeoScope {
                    site_ids: scope.site_ids,
                    building_ids: scope.building_ids,
                    zone_ids: scope.zone_ids,
                },
                linked_settings: LinkedSettings {
                    global: settings.global_settings,
                    sites: linked(settings.site_settings),
                    buildings: linked(settings.building_settings),
                    zones: linked(settings.zone_settings),
                },
            }
        });

        // The nested detail sometimes carries the only name.
        let name = non_blank(raw.name)
            .or_else(|| raw.segment.and_then(|s| non_blank(s.name)))
            .unwrap_or_default();

        Self {
            id: raw.id.unwrap_or_default(),
            name,
            tenant_id: non_blank(raw.tenant_id),
            version: scalar_text(raw.version),
            encrypted: raw.encrypted,
            setting_status: non_blank(raw.setting_status),
            detail,
        }
    }
}

// ── Devices ─────────────────────────────────────────────────────────

impl From<RawDevice> for NetworkDevice {
    fn from(raw: RawDevice) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            mac: MacAddress::new(raw.mac_address.unwrap_or_default()),
            tenant_id: non_blank(raw.tenant_id),
            site_id: non_blank(raw.site_id),
            building_id: non_blank(raw.building_id),
            floor_id: non_blank(raw.floor_id),
            zone_id: non_blank(raw.zone_id),
            segment_id: non_blank(raw.segment_id),
            device_id: non_blank(raw.device_id),
            state: AuthState::from_code(raw.state.as_deref()),
            authenticated_by: non_blank(raw.authenticated_by),
            port: scalar_text(raw.port),
            static_ip: non_blank(raw.static_ip),
            ip_address: non_blank(raw.ip_address),
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────────

impl From<ApiKeyRecord> for ApiKeyCredential {
    fn from(raw: ApiKeyRecord) -> Self {
        Self {
            id: raw.key_id,
            name: raw.name,
            key: SecretString::from(raw.key),
            service: raw.service,
            url: non_blank(raw.url),
            valid_before: scalar_text(raw.valid_before),
            tenant_id: non_blank(raw.tenant_id),
            created_at: non_blank(raw.created_at),
            updated_at: non_blank(raw.updated_at),
        }
    }
}
