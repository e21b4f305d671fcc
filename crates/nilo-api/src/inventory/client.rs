// Async client for the inventory / authorization API.
//
// Auth: vendor API-key header + tenant header on every request.
// Every call goes through the retry policy and owns a cancellation token.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::models::{
    DeviceRecord, Listing, MacStateUpdate, MacsListRequest, RawBuilding, RawDevice, RawFloor,
    RawSegment, RawSite, RawTenantTree,
};
use crate::auth::ApiCredential;
use crate::error::{Error, preview};
use crate::fetch::{self, RawResponse};
use crate::retry::{self, RetryPolicy, Sleeper};
use crate::transport::TransportConfig;

/// Substring the refresh endpoint puts in its plain-text success body.
pub const REFRESH_SUCCESS_MARKER: &str = "updated successfully";

/// Device-list filter for devices awaiting an authorization decision.
pub const AWAITING_APPROVAL_ACTION: &str = "AUTH_WAITING_FOR_APPROVAL";

/// Query for one page of the client list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPageQuery {
    pub tenant_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// 1-based.
    pub page_number: u32,
    pub page_size: u32,
}

impl ClientPageQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tenantId", self.tenant_id.clone()),
            (
                "startTime",
                self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("endTime", self.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("pageNumber", self.page_number.max(1).to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

/// Async client for the inventory API.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
/// Use [`with_credential`](Self::with_credential) to re-scope a client to
/// a different API key without rebuilding the connection pool.
#[derive(Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: Url,
    credential: ApiCredential,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryClient")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl InventoryClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(
        base_url: &str,
        credential: ApiCredential,
        transport: &TransportConfig,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, credential, retry)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        credential: ApiCredential,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            credential,
            retry,
            sleeper: retry::default_sleeper(),
        })
    }

    /// Same connection pool, different credential.
    pub fn with_credential(&self, credential: ApiCredential) -> Self {
        Self {
            credential,
            ..self.clone()
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn credential(&self) -> &ApiCredential {
        &self.credential
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request execution ────────────────────────────────────────────

    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;
        let headers = self.credential.headers()?;
        debug!(%method, %url, ?params, "inventory request");

        retry::execute(&self.retry, self.sleeper.as_ref(), cancel, |attempt| {
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers.clone())
                .query(params);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            debug!(attempt, "sending");
            fetch::send(builder, cancel)
        })
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, Error> {
        self.execute::<()>(Method::GET, path, params, None, cancel)
            .await?
            .json()
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, Error> {
        let listing: Listing<T> = self.get(path, params, cancel).await?;
        let items = listing.into_items();
        debug!(path, count = items.len(), "list received");
        Ok(items)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Hierarchy ────────────────────────────────────────────────────

    pub async fn tenant_tree(&self, cancel: &CancellationToken) -> Result<RawTenantTree, Error> {
        self.get("tree", &[], cancel).await
    }

    pub async fn list_sites(&self, cancel: &CancellationToken) -> Result<Vec<RawSite>, Error> {
        self.list("sites", &[], cancel).await
    }

    pub async fn list_buildings(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawBuilding>, Error> {
        self.list("buildings", &[], cancel).await
    }

    pub async fn list_floors(&self, cancel: &CancellationToken) -> Result<Vec<RawFloor>, Error> {
        self.list("floors", &[], cancel).await
    }

    pub async fn list_segments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawSegment>, Error> {
        self.list("segments", &[], cancel).await
    }

    // ── Devices / clients ────────────────────────────────────────────

    /// MAB device list, optionally filtered by an action such as
    /// [`AWAITING_APPROVAL_ACTION`].
    pub async fn list_devices(
        &self,
        action: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDevice>, Error> {
        let params: Vec<(&str, String)> = action
            .map(|a| vec![("action", a.to_owned())])
            .unwrap_or_default();
        let records: Vec<DeviceRecord> = self.list("devices", &params, cancel).await?;
        Ok(records.into_iter().filter_map(DeviceRecord::into_device).collect())
    }

    /// One page of the client list.
    pub async fn list_clients(
        &self,
        query: &ClientPageQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDevice>, Error> {
        let records: Vec<DeviceRecord> = self.list("clients", &query.params(), cancel).await?;
        Ok(records.into_iter().filter_map(DeviceRecord::into_device).collect())
    }

    /// Walk pages starting at `query.page_number` until a short page.
    pub async fn list_all_clients(
        &self,
        query: &ClientPageQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDevice>, Error> {
        let mut all = Vec::new();
        let mut page = query.clone();
        page.page_number = page.page_number.max(1);
        let page_size = usize::try_from(page.page_size).unwrap_or(usize::MAX);

        loop {
            // Page length counts every record, including ones dropped as blank
            let records: Vec<DeviceRecord> = self.list("clients", &page.params(), cancel).await?;
            let received = records.len();
            all.extend(records.into_iter().filter_map(DeviceRecord::into_device));
            if received == 0 || received < page_size {
                break;
            }
            page.page_number += 1;
        }

        Ok(all)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Change the authorization state of one MAC address.
    ///
    /// The request is resent on retryable statuses like any other call;
    /// it carries no idempotency key.
    pub async fn update_mac_state(
        &self,
        update: MacStateUpdate,
        cancel: &CancellationToken,
    ) -> Result<Value, Error> {
        info!(mac = %update.mac_address, state = %update.state, "updating MAC auth state");
        let body = MacsListRequest {
            macs_list: vec![update],
        };
        self.execute(Method::PATCH, "client-configs", &[], Some(&body), cancel)
            .await?
            .json()
    }

    /// Ask the backend to resync the tenant from the vendor.
    ///
    /// Success is signalled only by [`REFRESH_SUCCESS_MARKER`] in the
    /// plain-text body.
    pub async fn refresh_tenant(&self, cancel: &CancellationToken) -> Result<String, Error> {
        let resp = self
            .execute::<()>(Method::GET, "tenant/update", &[], None, cancel)
            .await?;

        if resp
            .body
            .to_lowercase()
            .contains(REFRESH_SUCCESS_MARKER)
        {
            info!("tenant refresh accepted");
            Ok(resp.body)
        } else {
            Err(Error::UnexpectedResponse(format!(
                "refresh did not report success: {}",
                preview(&resp.body)
            )))
        }
    }
}

/// Ensure the base URL ends in `/` so relative joins append.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}
