//! Domain layer between `nilo-api` and front-ends.
//!
//! This crate owns the business logic and domain model of the Nile
//! dashboard:
//!
//! - **[`Dashboard`]**: facade over every read and workflow. Resolves the
//!   inventory API key (explicit, or picked from the user's stored keys),
//!   fetches the hierarchy, devices and clients, and submits
//!   authorization decisions.
//!
//! - **[`SessionContext`]**: explicit owner of the identity-provider
//!   session; refreshes tokens shortly before they expire.
//!
//! - **[`reconcile()`]**: groups flat device lists into
//!   building -> floor -> device, ordered by resolved names, with
//!   [`ExpansionState`] tracking which groups are open.
//!
//! - **[`AuthorizeForm`]** / **[`FormState`]**: form values and errors, and
//!   the approve/deny workflow that validates before sending anything.
//!
//! - **[`ApiKeyManager`]** / **[`CredentialCache`]**: CRUD over the user's
//!   stored API keys with a reactive local mirror.
//!
//! - **[`Loader`]** / **[`GroupedView`]**: per-view fetch state with its own
//!   cancellation, and grouping that waits for every input.

pub mod authorize;
pub mod config;
pub mod convert;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod expansion;
pub mod form;
pub mod keys;
pub mod loader;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use authorize::{AuthorizationRequest, AuthorizeForm, StatusChoice, authorize_device};
pub use config::{
    DashboardConfig, FloorExpansion, IdentityConfig, TlsVerification, TreeView,
};
pub use credentials::{CredentialCache, import_credential, resolve_credential};
pub use dashboard::{ClientWindow, Dashboard, DeviceTree};
pub use error::CoreError;
pub use expansion::ExpansionState;
pub use form::{FORM_ERROR_KEY, FormState};
pub use keys::ApiKeyManager;
pub use loader::{GroupedView, LoadState, Loader};
pub use reconcile::{Groupable, Grouping, UNKNOWN_BUILDING, UNKNOWN_FLOOR, reconcile};
pub use session::{AuthSession, SessionContext};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Address, ApiKeyCredential, AuthState, Building, Floor, LinkedSettings, MacAddress,
    NetworkDevice, NetworkSegment, NewCredential, SegmentDetail, Site, Tenant,
};

// Transport types front-ends need without depending on `nilo-api`.
pub use nilo_api::{RetryPolicy, SessionTokens, UserAttribute, UserProfile};
