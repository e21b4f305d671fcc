// ── Runtime dashboard configuration ──
//
// Describes where the dashboard talks to and how. Carries credentials and
// connection tuning but never touches disk: the CLI builds a
// `DashboardConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use nilo_api::transport::{TlsMode, TransportConfig};
use nilo_api::RetryPolicy;
use secrecy::SecretString;
use url::Url;

/// Service label matched when picking a stored API key.
pub const DEFAULT_CREDENTIAL_TARGET: &str = "Nile";

/// Default page size for the client list.
pub const DEFAULT_CLIENT_PAGE_SIZE: u32 = 100;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed staging backends).
    DangerAcceptInvalid,
}

/// Identity-provider pool the dashboard signs users into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub endpoint: Url,
    pub client_id: String,
}

/// Which device listing a floor-expansion default applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeView {
    /// MAB device list.
    Devices,
    /// Paginated client list.
    Clients,
}

/// Whether floor groups start expanded, per view.
///
/// The two listings have always disagreed here; both are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorExpansion {
    pub devices: bool,
    pub clients: bool,
}

impl Default for FloorExpansion {
    fn default() -> Self {
        Self {
            devices: false,
            clients: true,
        }
    }
}

impl FloorExpansion {
    pub fn for_view(self, view: TreeView) -> bool {
        match view {
            TreeView::Devices => self.devices,
            TreeView::Clients => self.clients,
        }
    }
}

/// Everything needed to run the dashboard against one tenant.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Inventory / authorization API base URL.
    pub api_url: Url,
    /// Credential-store base URL. Falls back to `api_url`.
    pub store_url: Option<Url>,
    pub identity: Option<IdentityConfig>,
    pub tenant_id: Option<String>,
    /// Explicit inventory API key. When absent the key is resolved from
    /// the signed-in user's stored credentials.
    pub api_key: Option<SecretString>,
    pub credential_target: String,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub floor_expansion: FloorExpansion,
    pub client_page_size: u32,
}

impl DashboardConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            store_url: None,
            identity: None,
            tenant_id: None,
            api_key: None,
            credential_target: DEFAULT_CREDENTIAL_TARGET.into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            floor_expansion: FloorExpansion::default(),
            client_page_size: DEFAULT_CLIENT_PAGE_SIZE,
        }
    }

    pub fn store_url(&self) -> &Url {
        self.store_url.as_ref().unwrap_or(&self.api_url)
    }

    /// Transport settings shared by every client the dashboard builds.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }
}
