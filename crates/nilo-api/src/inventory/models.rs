// Wire types for the inventory API
//
// Field names arrive in two casings: the vendor's camelCase (`tenantId`,
// `buildingId`) and the flattened lowercase keys of the dashboard backend
// (`tenantid`, `bldgid`). Both are accepted through serde aliases. Shapes
// that vary between API versions are modelled as untagged enums and left
// for `nilo-core` to normalize in one place.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── List envelopes ──────────────────────────────────────────────────

/// The three list shapes the API has used over time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub enum Listing<T> {
    /// `[ ... ]`
    Bare(Vec<T>),
    /// `{ "content": [ ... ] }`
    Content { content: Vec<T> },
    /// `{ "data": { "content": [ ... ] } }`
    Data { data: ContentPage<T> },
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ContentPage<T> {
    pub content: Vec<T>,
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Content { content: items } => items,
            Self::Data { data } => data.content,
        }
    }
}

// ── Shape-tolerant scalars ──────────────────────────────────────────

/// A value the API sends either as a string or as a JSON number
/// (floor numbers, switch ports).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Render as text; numbers keep their JSON spelling (`3`, `2.5`).
    pub fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// An address as sent by the API: either a JSON object or that same
/// object serialized into a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    Structured(RawAddress),
    Serialized(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    #[serde(default, alias = "address", alias = "streetAddress")]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "zipCode", alias = "postalCode")]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<Scalar>,
    #[serde(default, alias = "longitude", alias = "lon")]
    pub lng: Option<Scalar>,
    #[serde(default, alias = "timezone", alias = "timeZoneId")]
    pub timezone_id: Option<String>,
}

// ── Hierarchy ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSite {
    #[serde(default, alias = "siteid", alias = "siteId")]
    pub id: Option<String>,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<AddressField>,
    /// Only present in the tenant tree.
    #[serde(default)]
    pub buildings: Vec<RawBuilding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBuilding {
    #[serde(default, alias = "bldgid", alias = "buildingId")]
    pub id: Option<String>,
    #[serde(default, alias = "siteid")]
    pub site_id: Option<String>,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<AddressField>,
    /// Only present in the tenant tree.
    #[serde(default)]
    pub floors: Vec<RawFloor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFloor {
    #[serde(default, alias = "floorid", alias = "floorId")]
    pub id: Option<String>,
    #[serde(default, alias = "bldgid", alias = "buildingid")]
    pub building_id: Option<String>,
    #[serde(default, alias = "siteid")]
    pub site_id: Option<String>,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<Scalar>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
}

/// `GET tree` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTenantTree {
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub sites: Vec<RawSite>,
}

// ── Segments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSegment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "instanceName")]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<Scalar>,
    #[serde(default)]
    pub encrypted: Option<bool>,
    #[serde(default)]
    pub setting_status: Option<String>,
    #[serde(default, alias = "segmentDetails")]
    pub segment: Option<RawSegmentInfo>,
    #[serde(default)]
    pub geo_scope: Option<RawGeoScope>,
    #[serde(default)]
    pub linked_settings: Option<RawLinkedSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct RawSegmentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub pop_tunnel_enabled: bool,
    #[serde(default)]
    pub wired_self_register_enabled: bool,
    #[serde(default)]
    pub wired_sso_enabled: bool,
    #[serde(default)]
    pub wired_guest_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGeoScope {
    #[serde(default)]
    pub site_ids: Vec<String>,
    #[serde(default)]
    pub building_ids: Vec<String>,
    #[serde(default)]
    pub zone_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLinkedSettings {
    #[serde(default)]
    pub global_settings: Vec<Value>,
    #[serde(default)]
    pub site_settings: Vec<RawLinkedSetting>,
    #[serde(default)]
    pub building_settings: Vec<RawLinkedSetting>,
    #[serde(default)]
    pub zone_settings: Vec<RawLinkedSetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLinkedSetting {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

// ── Devices / clients ───────────────────────────────────────────────

/// One MAB client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "mac", alias = "macaddress")]
    pub mac_address: Option<String>,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "siteid")]
    pub site_id: Option<String>,
    #[serde(default, alias = "buildingid", alias = "bldgid")]
    pub building_id: Option<String>,
    #[serde(default, alias = "floorid")]
    pub floor_id: Option<String>,
    #[serde(default, alias = "zoneid")]
    pub zone_id: Option<String>,
    #[serde(default, alias = "segmentid")]
    pub segment_id: Option<String>,
    #[serde(default, alias = "deviceid")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub port: Option<Scalar>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "authenticatedby")]
    pub authenticated_by: Option<String>,
    #[serde(default, alias = "staticip")]
    pub static_ip: Option<String>,
    #[serde(default, alias = "ipaddress")]
    pub ip_address: Option<String>,
}

/// The client-config endpoints wrap each record in `clientConfig`;
/// the dashboard backend sends it flat.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DeviceRecord {
    Wrapped {
        #[serde(rename = "clientConfig")]
        client_config: RawDevice,
    },
    Flat(RawDevice),
}

impl DeviceRecord {
    /// The device inside the record, or `None` when it names neither a MAC
    /// nor an id (a `clientConfig` that was null or malformed).
    pub fn into_device(self) -> Option<RawDevice> {
        let device = match self {
            Self::Wrapped { client_config } => client_config,
            Self::Flat(device) => device,
        };
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        (present(&device.mac_address) || present(&device.id)).then_some(device)
    }
}

// ── Mutations ───────────────────────────────────────────────────────

/// One entry of a MAC authorization state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacStateUpdate {
    /// `"{clientId}-{macAddress}"`.
    pub id: String,
    pub mac_address: String,
    pub segment_id: String,
    pub state: String,
    pub description: String,
}

/// `PATCH client-configs` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacsListRequest {
    pub macs_list: Vec<MacStateUpdate>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_accepts_all_three_shapes() {
        let bare: Listing<RawSite> = serde_json::from_value(json!([{ "id": "s1" }])).unwrap();
        let content: Listing<RawSite> =
            serde_json::from_value(json!({ "content": [{ "id": "s1" }] })).unwrap();
        let nested: Listing<RawSite> =
            serde_json::from_value(json!({ "data": { "content": [{ "id": "s1" }] } })).unwrap();

        for listing in [bare, content, nested] {
            let items = listing.into_items();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id.as_deref(), Some("s1"));
        }
    }

    #[test]
    fn backend_lowercase_keys_are_accepted() {
        let floor: RawFloor = serde_json::from_value(json!({
            "tenantid": "t", "siteid": "s", "bldgid": "b", "floorid": "f",
            "name": "Ground", "number": 0
        }))
        .unwrap();
        assert_eq!(floor.building_id.as_deref(), Some("b"));
        assert_eq!(floor.id.as_deref(), Some("f"));
        assert_eq!(floor.number.unwrap().into_text(), "0");
    }

    #[test]
    fn address_arrives_structured_or_serialized() {
        let structured: AddressField =
            serde_json::from_value(json!({ "city": "Austin", "zipCode": "78701" })).unwrap();
        assert!(matches!(structured, AddressField::Structured(ref a) if a.zip.as_deref() == Some("78701")));

        let serialized: AddressField =
            serde_json::from_value(json!("{\"city\":\"Austin\"}")).unwrap();
        assert!(matches!(serialized, AddressField::Serialized(_)));
    }

    #[test]
    fn wrapped_and_flat_device_records() {
        let wrapped: DeviceRecord = serde_json::from_value(json!({
            "clientConfig": { "id": "c1", "macAddress": "aa:bb", "state": "AUTH_OK" }
        }))
        .unwrap();
        let flat: DeviceRecord = serde_json::from_value(json!({
            "id": "c2", "macAddress": "cc:dd", "buildingid": "b1", "port": 12
        }))
        .unwrap();

        let a = wrapped.into_device().unwrap();
        let b = flat.into_device().unwrap();
        assert_eq!(a.mac_address.as_deref(), Some("aa:bb"));
        assert_eq!(b.building_id.as_deref(), Some("b1"));
        assert_eq!(b.port.unwrap().into_text(), "12");
    }

    #[test]
    fn records_without_mac_or_id_are_dropped() {
        for body in [
            json!({ "clientConfig": null }),
            json!({ "clientConfig": "garbage" }),
            json!({ "clientConfig": { "macAddress": "" } }),
            json!({}),
        ] {
            let record: DeviceRecord = serde_json::from_value(body.clone()).unwrap();
            assert!(record.into_device().is_none(), "{body}");
        }

        let id_only: DeviceRecord = serde_json::from_value(json!({ "id": "c9" })).unwrap();
        assert!(id_only.into_device().is_some());
    }

    #[test]
    fn macs_list_serializes_camel_case() {
        let body = MacsListRequest {
            macs_list: vec![MacStateUpdate {
                id: "c1-aa:bb".into(),
                mac_address: "aa:bb".into(),
                segment_id: "seg".into(),
                state: "AUTH_OK".into(),
                description: "ok".into(),
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["macsList"][0]["macAddress"], "aa:bb");
        assert_eq!(value["macsList"][0]["segmentId"], "seg");
    }
}
