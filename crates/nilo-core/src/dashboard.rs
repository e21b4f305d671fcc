// ── Dashboard facade ──
//
// The single entry point front-ends talk to. Owns the session context,
// the API-key manager and the resolved inventory client, and exposes
// every read and workflow as one async call returning domain types.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use nilo_api::inventory::AWAITING_APPROVAL_ACTION;
use nilo_api::{
    ApiCredential, ClientPageQuery, CognitoClient, IdentityProvider, InventoryClient,
    KeyStoreClient,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::authorize::AuthorizeForm;
use crate::config::{DashboardConfig, TreeView};
use crate::credentials::resolve_credential;
use crate::error::CoreError;
use crate::expansion::ExpansionState;
use crate::keys::ApiKeyManager;
use crate::loader::GroupedView;
use crate::model::{Building, Floor, MacAddress, NetworkDevice, NetworkSegment, Site, Tenant};
use crate::reconcile::Grouping;
use crate::session::SessionContext;
use crate::tree;

// ── Views ───────────────────────────────────────────────────────────

/// A building -> floor -> device tree with its starting expand state.
#[derive(Debug, Clone)]
pub struct DeviceTree {
    pub grouping: Grouping<NetworkDevice>,
    pub expansion: ExpansionState,
}

/// Which slice of the client list to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// 1-based page; `None` walks every page.
    pub page: Option<u32>,
    pub page_size: u32,
}

impl ClientWindow {
    /// The 24 hours up to `now`, first page.
    pub fn last_day(now: DateTime<Utc>, page_size: u32) -> Self {
        Self {
            start: now - Duration::hours(24),
            end: now,
            page: Some(1),
            page_size,
        }
    }

    pub fn all_pages(mut self) -> Self {
        self.page = None;
        self
    }
}

// ── Dashboard ───────────────────────────────────────────────────────

/// Cheaply cloneable handle to one tenant's dashboard.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    session: Option<Arc<SessionContext>>,
    keys: Option<ApiKeyManager>,
    /// Built on first use, once a credential is resolved.
    inventory: Mutex<Option<InventoryClient>>,
}

impl Dashboard {
    /// Build from configuration. The identity provider is the hosted
    /// pool named in `config.identity`, if any.
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let provider: Option<Arc<dyn IdentityProvider>> = match &config.identity {
            Some(identity) => Some(Arc::new(CognitoClient::new(
                identity.endpoint.as_str(),
                &identity.client_id,
                &config.transport(),
            )?)),
            None => None,
        };
        Self::assemble(config, provider)
    }

    /// Build with an explicit identity provider.
    pub fn with_identity(
        config: DashboardConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, CoreError> {
        Self::assemble(config, Some(provider))
    }

    fn assemble(
        config: DashboardConfig,
        provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self, CoreError> {
        let session = provider.map(|p| Arc::new(SessionContext::new(p)));
        let keys = match &session {
            Some(session) => Some(ApiKeyManager::new(
                KeyStoreClient::new(config.store_url().as_str(), &config.transport())?,
                Arc::clone(session),
            )),
            None => None,
        };

        debug!(
            api_url = %config.api_url,
            identity = session.is_some(),
            explicit_key = config.api_key.is_some(),
            "dashboard configured"
        );

        Ok(Self {
            inner: Arc::new(DashboardInner {
                config,
                session,
                keys,
                inventory: Mutex::new(None),
            }),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn session(&self) -> Result<&Arc<SessionContext>, CoreError> {
        self.inner.session.as_ref().ok_or_else(|| CoreError::Config {
            message: "no identity provider configured".into(),
        })
    }

    pub fn keys(&self) -> Result<&ApiKeyManager, CoreError> {
        self.inner.keys.as_ref().ok_or_else(|| CoreError::Config {
            message: "no identity provider configured; stored API keys are unavailable".into(),
        })
    }

    // ── Credential resolution ────────────────────────────────────────

    /// The inventory client, resolving its API key on first use.
    ///
    /// An explicitly configured key wins; otherwise the signed-in user's
    /// stored keys are searched for `credential_target`.
    pub async fn inventory(&self, cancel: &CancellationToken) -> Result<InventoryClient, CoreError> {
        let mut slot = self.inner.inventory.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let config = &self.inner.config;
        let credential = if let Some(key) = &config.api_key {
            ApiCredential::new(key, config.tenant_id.clone())
        } else {
            let Some(keys) = &self.inner.keys else {
                return Err(CoreError::NoCredentialAvailable {
                    target: config.credential_target.clone(),
                });
            };
            let stored = keys.ensure_loaded(cancel).await?;
            let chosen = resolve_credential(&stored, &config.credential_target)?;
            ApiCredential::new(
                &chosen.key,
                config.tenant_id.clone().or_else(|| chosen.tenant_id.clone()),
            )
        };

        let client = InventoryClient::new(
            config.api_url.as_str(),
            credential,
            &config.transport(),
            config.retry.clone(),
        )?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the resolved client so the next call resolves again.
    pub async fn reset_credentials(&self) {
        *self.inner.inventory.lock().await = None;
    }

    fn tenant_for(&self, client: &InventoryClient) -> Result<String, CoreError> {
        self.inner
            .config
            .tenant_id
            .clone()
            .or_else(|| client.credential().tenant_id().map(str::to_owned))
            .ok_or_else(|| CoreError::Config {
                message: "tenant id is required for this request".into(),
            })
    }

    // ── Hierarchy ────────────────────────────────────────────────────

    /// The tenant tree as the backend assembles it.
    pub async fn tenant(&self, cancel: &CancellationToken) -> Result<Tenant, CoreError> {
        let client = self.inventory(cancel).await?;
        let raw = client.tenant_tree(cancel).await?;
        let id = raw
            .tenant_id
            .filter(|t| !t.is_empty())
            .or_else(|| self.tenant_for(&client).ok())
            .unwrap_or_default();
        Ok(Tenant {
            id,
            sites: raw
                .sites
                .into_iter()
                .map(Site::from)
                .filter(|s| !s.id.is_empty())
                .collect(),
        })
    }

    /// The tenant tree assembled locally from the three flat listings.
    pub async fn assembled_tenant(&self, cancel: &CancellationToken) -> Result<Tenant, CoreError> {
        let client = self.inventory(cancel).await?;
        let (sites, buildings, floors) = tokio::try_join!(
            client.list_sites(cancel),
            client.list_buildings(cancel),
            client.list_floors(cancel),
        )?;
        let tenant_id = self.tenant_for(&client).unwrap_or_default();
        Ok(tree::assemble_tenant(
            &tenant_id,
            sites.into_iter().map(Site::from).collect(),
            buildings.into_iter().map(Building::from).collect(),
            floors.into_iter().map(Floor::from).collect(),
        ))
    }

    pub async fn sites(&self, cancel: &CancellationToken) -> Result<Vec<Site>, CoreError> {
        let client = self.inventory(cancel).await?;
        let raw = client.list_sites(cancel).await?;
        Ok(raw.into_iter().map(Site::from).collect())
    }

    pub async fn buildings(&self, cancel: &CancellationToken) -> Result<Vec<Building>, CoreError> {
        let client = self.inventory(cancel).await?;
        let raw = client.list_buildings(cancel).await?;
        Ok(raw.into_iter().map(Building::from).collect())
    }

    /// Floors with their site and building names filled in.
    pub async fn floors(&self, cancel: &CancellationToken) -> Result<Vec<Floor>, CoreError> {
        let client = self.inventory(cancel).await?;
        let (sites, buildings, floors) = tokio::try_join!(
            client.list_sites(cancel),
            client.list_buildings(cancel),
            client.list_floors(cancel),
        )?;
        let sites: Vec<Site> = sites.into_iter().map(Site::from).collect();
        let buildings: Vec<Building> = buildings.into_iter().map(Building::from).collect();
        Ok(tree::enrich_floors(
            floors.into_iter().map(Floor::from).collect(),
            &sites,
            &buildings,
        ))
    }

    pub async fn segments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<NetworkSegment>, CoreError> {
        let client = self.inventory(cancel).await?;
        let raw = client.list_segments(cancel).await?;
        Ok(raw.into_iter().map(NetworkSegment::from).collect())
    }

    // ── Devices / clients ────────────────────────────────────────────

    /// MAB devices; `waiting_only` keeps those awaiting a decision.
    pub async fn devices(
        &self,
        waiting_only: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<NetworkDevice>, CoreError> {
        let client = self.inventory(cancel).await?;
        let action = waiting_only.then_some(AWAITING_APPROVAL_ACTION);
        let raw = client.list_devices(action, cancel).await?;
        Ok(raw.into_iter().map(NetworkDevice::from).collect())
    }

    pub async fn clients(
        &self,
        window: &ClientWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<NetworkDevice>, CoreError> {
        let client = self.inventory(cancel).await?;
        let query = ClientPageQuery {
            tenant_id: self.tenant_for(&client)?,
            start: window.start,
            end: window.end,
            page_number: window.page.unwrap_or(1),
            page_size: window.page_size,
        };
        let raw = match window.page {
            Some(_) => client.list_clients(&query, cancel).await?,
            None => client.list_all_clients(&query, cancel).await?,
        };
        Ok(raw.into_iter().map(NetworkDevice::from).collect())
    }

    /// Devices grouped by building and floor.
    pub async fn device_tree(
        &self,
        waiting_only: bool,
        cancel: &CancellationToken,
    ) -> Result<DeviceTree, CoreError> {
        let (devices, (buildings, floors)) =
            tokio::try_join!(self.devices(waiting_only, cancel), self.placement(cancel))?;
        Ok(self.group(TreeView::Devices, devices, buildings, floors))
    }

    /// Clients grouped by building and floor.
    pub async fn client_tree(
        &self,
        window: &ClientWindow,
        cancel: &CancellationToken,
    ) -> Result<DeviceTree, CoreError> {
        let (clients, (buildings, floors)) =
            tokio::try_join!(self.clients(window, cancel), self.placement(cancel))?;
        Ok(self.group(TreeView::Clients, clients, buildings, floors))
    }

    /// Buildings and floors as listed, without name enrichment. Grouping
    /// only needs their ids and names, so sites are not fetched.
    async fn placement(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Building>, Vec<Floor>), CoreError> {
        let client = self.inventory(cancel).await?;
        let (buildings, floors) =
            tokio::try_join!(client.list_buildings(cancel), client.list_floors(cancel))?;
        Ok((
            buildings.into_iter().map(Building::from).collect(),
            floors.into_iter().map(Floor::from).collect(),
        ))
    }

    fn group(
        &self,
        view: TreeView,
        items: Vec<NetworkDevice>,
        buildings: Vec<Building>,
        floors: Vec<Floor>,
    ) -> DeviceTree {
        let mut grouped = GroupedView::new(self.inner.config.floor_expansion.for_view(view));
        grouped.set_items(Arc::new(items));
        grouped.set_buildings(Arc::new(buildings));
        grouped.set_floors(Arc::new(floors));
        match grouped.into_parts() {
            Some((grouping, expansion)) => DeviceTree {
                grouping,
                expansion,
            },
            None => DeviceTree {
                grouping: Grouping::default(),
                expansion: ExpansionState::default(),
            },
        }
    }

    // ── Workflows ────────────────────────────────────────────────────

    /// Validate and submit an authorization form.
    pub async fn authorize(
        &self,
        form: &mut AuthorizeForm,
        cancel: &CancellationToken,
    ) -> Result<MacAddress, CoreError> {
        // Bad input never reaches credential resolution either.
        form.prepare()?;
        let client = self.inventory(cancel).await?;
        form.submit(&client, cancel).await
    }

    /// Ask the backend to resync the tenant from the vendor.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<String, CoreError> {
        let client = self.inventory(cancel).await?;
        let body = client.refresh_tenant(cancel).await?;
        info!("tenant refresh completed");
        Ok(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn last_day_window_spans_24_hours() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let window = ClientWindow::last_day(now, 50);
        assert_eq!(window.end - window.start, Duration::hours(24));
        assert_eq!(window.page, Some(1));
        assert_eq!(window.all_pages().page, None);
    }

    #[tokio::test]
    async fn no_key_and_no_identity_has_no_credential() {
        let config = DashboardConfig::new("https://api.example.com".parse().unwrap());
        let dashboard = Dashboard::new(config).unwrap();
        let err = dashboard
            .inventory(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoCredentialAvailable { .. }));
        assert!(dashboard.session().is_err());
    }
}
