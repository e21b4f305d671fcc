// ── Dashboard domain model ──
//
// Canonical shapes for everything the dashboard renders. Raw API records
// are normalized into these once, in `convert`, and nothing downstream
// looks at wire types again.

pub mod address;
pub mod credential;
pub mod device;
pub mod mac;
pub mod segment;
pub mod site;

// ── Re-exports ──────────────────────────────────────────────────────

pub use address::Address;
pub use credential::{ApiKeyCredential, NewCredential};
pub use device::{AuthState, NetworkDevice};
pub use mac::MacAddress;
pub use segment::{GeoScope, LinkedSetting, LinkedSettings, NetworkSegment, SegmentDetail};
pub use site::{Building, Floor, Site, Tenant};
