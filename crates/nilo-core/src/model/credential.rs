// ── Stored API credentials ──

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

/// One of the user's stored external API keys.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCredential {
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "serialize_masked")]
    pub key: SecretString,
    pub service: String,
    pub url: Option<String>,
    /// Expiry as sent by the store (epoch seconds or a date string).
    pub valid_before: Option<String>,
    pub tenant_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Fields for creating a credential; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: String,
    pub key: SecretString,
    pub service: String,
    pub url: Option<String>,
    pub valid_before: Option<String>,
    pub tenant_id: Option<String>,
}

impl ApiKeyCredential {
    /// The key with all but its last four characters hidden.
    pub fn masked_key(&self) -> String {
        mask(self.key.expose_secret())
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

fn serialize_masked<S: Serializer>(key: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&mask(key.expose_secret()))
}
