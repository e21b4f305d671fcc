// Hosted identity provider
//
// The account operations the dashboard needs from its identity provider,
// behind a trait so the session context can be driven by a fake in tests.
// `CognitoClient` speaks the provider's JSON-over-HTTPS protocol.

pub mod claims;
pub mod cognito;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use claims::TokenClaims;
pub use cognito::CognitoClient;

use crate::error::Error;

/// Tokens issued on sign-in or refresh.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub id_token: SecretString,
    pub access_token: SecretString,
    /// Absent on refresh responses; keep the previous one.
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access and ID tokens, in seconds.
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

impl SessionTokens {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in)
    }

    /// Whether the tokens expire within `leeway` of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        now + leeway >= self.expires_at()
    }
}

/// A name/value user attribute (`email`, `name`, `custom:...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttribute {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The signed-in user as the provider describes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub attributes: Vec<UserAttribute>,
}

impl UserProfile {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.attribute("email")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.attribute("name")
    }
}

/// Where a verification code was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDelivery {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub delivery_medium: Option<String>,
    #[serde(default)]
    pub attribute_name: Option<String>,
}

/// Result of a sign-up call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user_sub: Option<String>,
    pub confirmed: bool,
    pub delivery: Option<CodeDelivery>,
}

/// Account operations offered by the identity provider.
///
/// Methods taking an `access_token` act on the signed-in user; the others
/// are anonymous.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        username: &str,
        password: &SecretString,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<SignUpOutcome, Error>;

    async fn confirm_registration(
        &self,
        username: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;

    async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<SessionTokens, Error>;

    async fn refresh(
        &self,
        refresh_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<SessionTokens, Error>;

    async fn sign_out(
        &self,
        access_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;

    async fn get_user(
        &self,
        access_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<UserProfile, Error>;

    async fn update_user_attributes(
        &self,
        access_token: &SecretString,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<(), Error>;

    async fn change_password(
        &self,
        access_token: &SecretString,
        old_password: &SecretString,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;

    async fn forgot_password(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<CodeDelivery, Error>;

    async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn expiry_honours_leeway() {
        let issued = DateTime::from_timestamp(1_000, 0).unwrap();
        let tokens = SessionTokens {
            id_token: SecretString::from("id"),
            access_token: SecretString::from("access"),
            refresh_token: None,
            expires_in: 3600,
            issued_at: issued,
        };
        let now = issued + Duration::seconds(3500);
        assert!(!tokens.is_expired_at(now, Duration::zero()));
        assert!(tokens.is_expired_at(now, Duration::seconds(120)));
    }

    #[test]
    fn profile_reads_named_attributes() {
        let profile = UserProfile {
            username: "ada".into(),
            attributes: vec![
                UserAttribute::new("email", "ada@example.com"),
                UserAttribute::new("name", "Ada"),
            ],
        };
        assert_eq!(profile.email(), Some("ada@example.com"));
        assert_eq!(profile.display_name(), Some("Ada"));
        assert_eq!(profile.attribute("phone_number"), None);
    }
}
