// ── API-key management ──
//
// CRUD against the credential store, mirrored into the local
// `CredentialCache`. The cache only changes after the store accepted the
// change. Two in-flight writes to the same key id are not reconciled:
// whichever response lands last wins.

use std::sync::Arc;

use nilo_api::KeyStoreClient;
use nilo_api::keystore::models::{ApiKeyUpdate, NewApiKey};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::credentials::CredentialCache;
use crate::error::CoreError;
use crate::model::{ApiKeyCredential, NewCredential};
use crate::session::SessionContext;

pub struct ApiKeyManager {
    client: KeyStoreClient,
    session: Arc<SessionContext>,
    cache: CredentialCache,
}

/// Fields every stored key must carry.
fn require_fields(
    name: &str,
    key: &SecretString,
    service: &str,
    tenant_id: Option<&str>,
) -> Result<(), CoreError> {
    let blank = |v: &str| v.trim().is_empty();
    if blank(name) {
        return Err(CoreError::validation("name", "name is required"));
    }
    if blank(key.expose_secret()) {
        return Err(CoreError::validation("key", "API key value is required"));
    }
    if blank(service) {
        return Err(CoreError::validation("service", "service is required"));
    }
    if tenant_id.is_none_or(blank) {
        return Err(CoreError::validation("tenant", "tenant id is required"));
    }
    Ok(())
}

impl ApiKeyManager {
    pub fn new(client: KeyStoreClient, session: Arc<SessionContext>) -> Self {
        Self {
            client,
            session,
            cache: CredentialCache::new(),
        }
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// ID token of a session that names its user.
    async fn token(&self, cancel: &CancellationToken) -> Result<SecretString, CoreError> {
        let session = self.session.ensure_fresh(cancel).await?;
        let Some(principal) = session.principal_id() else {
            return Err(CoreError::NotAuthenticated);
        };
        debug!(principal, "credential store call");
        Ok(session.tokens.id_token.clone())
    }

    /// Reload every key from the store.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<ApiKeyCredential>>, CoreError> {
        let token = self.token(cancel).await?;
        let records = self
            .client
            .list(&token, cancel)
            .await
            .map_err(CoreError::from_store)?;
        self.cache
            .replace_all(records.into_iter().map(ApiKeyCredential::from).collect());
        Ok(self.cache.snapshot())
    }

    /// Current keys, listing them first if nothing is cached yet.
    pub async fn ensure_loaded(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<ApiKeyCredential>>, CoreError> {
        if self.cache.is_empty() {
            self.list(cancel).await
        } else {
            Ok(self.cache.snapshot())
        }
    }

    pub async fn create(
        &self,
        fields: NewCredential,
        cancel: &CancellationToken,
    ) -> Result<ApiKeyCredential, CoreError> {
        let token = self.token(cancel).await?;
        require_fields(
            &fields.name,
            &fields.key,
            &fields.service,
            fields.tenant_id.as_deref(),
        )?;

        let body = NewApiKey {
            name: fields.name.trim().to_owned(),
            key: fields.key.expose_secret().trim().to_owned(),
            service: fields.service.trim().to_owned(),
            url: fields.url,
            valid_before: fields.valid_before,
            tenant_id: fields.tenant_id,
        };
        let record = self
            .client
            .create(&token, &body, cancel)
            .await
            .map_err(CoreError::from_store)?;

        let created = ApiKeyCredential::from(record);
        info!(id = %created.id, service = %created.service, "API key created");
        self.cache.append(created.clone());
        Ok(created)
    }

    pub async fn update(
        &self,
        credential: &ApiKeyCredential,
        cancel: &CancellationToken,
    ) -> Result<ApiKeyCredential, CoreError> {
        let token = self.token(cancel).await?;
        require_fields(
            &credential.name,
            &credential.key,
            &credential.service,
            credential.tenant_id.as_deref(),
        )?;

        let body = ApiKeyUpdate {
            key_id: credential.id.clone(),
            name: credential.name.trim().to_owned(),
            key: credential.key.expose_secret().trim().to_owned(),
            service: credential.service.trim().to_owned(),
            url: credential.url.clone(),
            valid_before: credential.valid_before.clone(),
            tenant_id: credential.tenant_id.clone(),
        };
        let echoed = ApiKeyCredential::from(
            self.client
                .update(&token, &body, cancel)
                .await
                .map_err(CoreError::from_store)?,
        );

        // The store echoes only what changed; keep what we sent.
        let mut updated = credential.clone();
        if echoed.created_at.is_some() {
            updated.created_at = echoed.created_at;
        }
        if echoed.updated_at.is_some() {
            updated.updated_at = echoed.updated_at;
        }

        if !self.cache.replace(updated.clone()) {
            debug!(id = %updated.id, "updated key is not in the cache");
        }
        info!(id = %updated.id, "API key updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), CoreError> {
        let token = self.token(cancel).await?;
        self.client
            .delete(&token, id, cancel)
            .await
            .map_err(CoreError::from_store)?;
        self.cache.remove(id);
        info!(id, "API key deleted");
        Ok(())
    }
}
