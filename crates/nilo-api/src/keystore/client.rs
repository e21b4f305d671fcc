// Credential-store HTTP client
//
// CRUD over the user's stored API keys. Authenticated with the identity
// session's ID token as a bearer token; the store derives the owning user
// from its claims. Calls are not retried.

use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use secrecy::SecretString;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::models::{ApiKeyList, ApiKeyRecord, ApiKeyUpdate, NewApiKey};
use crate::auth::bearer;
use crate::error::Error;
use crate::fetch::{self, RawResponse};
use crate::transport::TransportConfig;

const API_KEYS_PATH: &str = "api-keys";

/// Client for the backend credential store.
#[derive(Clone)]
pub struct KeyStoreClient {
    http: reqwest::Client,
    base_url: Url,
}

impl KeyStoreClient {
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(Self {
            http,
            base_url: url,
        })
    }

    async fn call<B: Serialize + Sync>(
        &self,
        method: Method,
        id_token: &SecretString,
        query: &[(&str, &str)],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let url = self.base_url.join(API_KEYS_PATH)?;
        debug!(%method, %url, "credential store request");

        let mut builder = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, bearer(id_token)?)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = fetch::send(builder, cancel).await?;
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(resp.into_status_error())
        }
    }

    /// All records owned by the session's user.
    pub async fn list(
        &self,
        id_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApiKeyRecord>, Error> {
        let list: ApiKeyList = self
            .call::<()>(Method::GET, id_token, &[], None, cancel)
            .await?
            .json()?;
        Ok(list.api_keys)
    }

    /// Create a record. The store answers `201` with the stored item.
    pub async fn create(
        &self,
        id_token: &SecretString,
        key: &NewApiKey,
        cancel: &CancellationToken,
    ) -> Result<ApiKeyRecord, Error> {
        self.call(Method::POST, id_token, &[], Some(key), cancel)
            .await?
            .json()
    }

    /// Replace a record's attributes. A missing `keyId` answers `404`.
    pub async fn update(
        &self,
        id_token: &SecretString,
        update: &ApiKeyUpdate,
        cancel: &CancellationToken,
    ) -> Result<ApiKeyRecord, Error> {
        let resp = self
            .call(Method::PUT, id_token, &[], Some(update), cancel)
            .await?;

        // The store echoes only the changed attributes; fill in the rest.
        let mut record: ApiKeyRecord = match resp.json::<serde_json::Value>()? {
            serde_json::Value::Object(mut map) => {
                map.entry("keyId")
                    .or_insert_with(|| update.key_id.clone().into());
                serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
                    Error::Deserialization {
                        message: e.to_string(),
                        body: resp.body.clone(),
                    }
                })?
            }
            _ => ApiKeyRecord::default(),
        };
        if record.key_id.is_empty() {
            record.key_id.clone_from(&update.key_id);
        }
        Ok(record)
    }

    pub async fn delete(
        &self,
        id_token: &SecretString,
        key_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.call::<()>(Method::DELETE, id_token, &[("keyId", key_id)], None, cancel)
            .await?;
        Ok(())
    }
}
