use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header carrying the vendor API key on inventory API calls.
pub const API_KEY_HEADER: &str = "x-nile-api-key";

/// Header scoping an inventory call to a tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// A resolved external-API credential, ready to attach to a request.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    key: SecretString,
    tenant_id: Option<String>,
}

impl ApiCredential {
    /// Wrap a secret. Surrounding whitespace is trimmed; users paste keys.
    pub fn new(key: &SecretString, tenant_id: Option<String>) -> Self {
        let trimmed = key.expose_secret().trim().to_owned();
        Self {
            key: SecretString::from(trimmed),
            tenant_id: tenant_id.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Headers for an inventory API call. The key value is marked sensitive
    /// so it never shows up in `Debug` output.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        let mut key_value = HeaderValue::from_str(self.key.expose_secret())
            .map_err(|e| Error::InvalidHeader(format!("API key: {e}")))?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        if let Some(tenant) = &self.tenant_id {
            let tenant_value = HeaderValue::from_str(tenant)
                .map_err(|e| Error::InvalidHeader(format!("tenant id: {e}")))?;
            headers.insert(TENANT_HEADER, tenant_value);
        }

        Ok(headers)
    }
}

/// `Authorization` header value for bearer-token surfaces.
pub(crate) fn bearer(token: &SecretString) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| Error::InvalidHeader(format!("bearer token: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
