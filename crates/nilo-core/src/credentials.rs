// ── Stored credentials ──
//
// Picking which stored API key an outbound call uses, the reactive local
// cache of the user's keys, and importing a key from an uploaded JSON
// document.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ApiKeyCredential, NewCredential};

// ── Resolution ──────────────────────────────────────────────────────

/// Pick the credential for `target`.
///
/// First match wins, in list order:
/// 1. service label equal to `target`
/// 2. service label containing `target`, ignoring case
/// 3. the first credential in the list
pub fn resolve_credential<'a>(
    credentials: &'a [ApiKeyCredential],
    target: &str,
) -> Result<&'a ApiKeyCredential, CoreError> {
    let needle = target.to_lowercase();

    let found = credentials
        .iter()
        .find(|c| c.service == target)
        .or_else(|| {
            credentials
                .iter()
                .find(|c| c.service.to_lowercase().contains(&needle))
        })
        .or_else(|| credentials.first());

    match found {
        Some(credential) => {
            debug!(target, credential = %credential.id, "resolved stored credential");
            Ok(credential)
        }
        None => Err(CoreError::NoCredentialAvailable {
            target: target.to_owned(),
        }),
    }
}

// ── Cache ───────────────────────────────────────────────────────────

/// The user's credentials as last seen from the store.
///
/// Mutations are append / replace-by-id / remove-by-id only; every change
/// publishes a fresh snapshot to subscribers.
pub struct CredentialCache {
    snapshot: watch::Sender<Arc<Vec<ApiKeyCredential>>>,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Current contents (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<ApiKeyCredential>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<ApiKeyCredential>>> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// Replace everything after a full listing.
    pub fn replace_all(&self, credentials: Vec<ApiKeyCredential>) {
        debug!(count = credentials.len(), "credential cache reloaded");
        // `send_modify` updates even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(credentials));
    }

    pub fn append(&self, credential: ApiKeyCredential) {
        self.snapshot.send_modify(|snap| {
            let mut next = Vec::clone(snap);
            next.push(credential);
            *snap = Arc::new(next);
        });
    }

    /// Replace the entry with the same id. Returns `false` when none matched.
    pub fn replace(&self, credential: ApiKeyCredential) -> bool {
        let mut replaced = false;
        self.snapshot.send_if_modified(|snap| {
            let Some(index) = snap.iter().position(|c| c.id == credential.id) else {
                return false;
            };
            let mut next = Vec::clone(snap);
            next[index] = credential;
            *snap = Arc::new(next);
            replaced = true;
            true
        });
        replaced
    }

    /// Remove the entry with `id`. Returns `false` when none matched.
    pub fn remove(&self, id: &str) -> bool {
        self.snapshot.send_if_modified(|snap| {
            if !snap.iter().any(|c| c.id == id) {
                return false;
            }
            let next: Vec<ApiKeyCredential> = snap.iter().filter(|c| c.id != id).cloned().collect();
            *snap = Arc::new(next);
            true
        })
    }

    pub fn clear(&self) {
        self.snapshot.send_modify(|snap| *snap = Arc::new(Vec::new()));
    }
}

// ── Import ──────────────────────────────────────────────────────────

/// Accepted field names for each imported value, in precedence order.
pub const SECRET_ALIASES: &[&str] = &["api_key", "apiKey", "api_token", "key", "token", "value"];
pub const NAME_ALIASES: &[&str] = &["name", "keyName", "label"];
pub const SERVICE_ALIASES: &[&str] = &["service", "provider"];
pub const URL_ALIASES: &[&str] = &["url", "endpoint"];
pub const TENANT_ALIASES: &[&str] = &["tenantId", "tenant_id", "tenant"];

/// First alias holding a non-blank string.
fn first_alias(doc: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        doc.get(alias)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    })
}

/// Build a new credential from an uploaded key file.
///
/// Only the secret is mandatory; the other fields are best-effort and are
/// validated later, when the credential is actually created.
pub fn import_credential(doc: &Value) -> Result<NewCredential, CoreError> {
    let secret = first_alias(doc, SECRET_ALIASES).ok_or_else(|| CoreError::MissingField {
        field: SECRET_ALIASES.join("|"),
    })?;

    Ok(NewCredential {
        name: first_alias(doc, NAME_ALIASES).unwrap_or_default(),
        key: SecretString::from(secret),
        service: first_alias(doc, SERVICE_ALIASES).unwrap_or_default(),
        url: first_alias(doc, URL_ALIASES),
        valid_before: None,
        tenant_id: first_alias(doc, TENANT_ALIASES),
    })
}
