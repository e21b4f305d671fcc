// ── Session context ──
//
// Explicit owner of the signed-in user's identity-provider session.
// Created once at startup and passed to whatever needs a token; sign-out
// empties it. Subscribers see every sign-in, refresh and sign-out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use nilo_api::{
    CodeDelivery, IdentityProvider, SessionTokens, SignUpOutcome, TokenClaims, UserAttribute,
    UserProfile,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Refresh tokens this long before they expire.
const REFRESH_LEEWAY_SECS: i64 = 60;

/// An active session: the provider's tokens plus the claims read from
/// the ID token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub tokens: SessionTokens,
    pub claims: TokenClaims,
}

impl AuthSession {
    pub fn from_tokens(tokens: SessionTokens) -> Result<Self, CoreError> {
        let claims = TokenClaims::decode(tokens.id_token.expose_secret())?;
        Ok(Self { tokens, claims })
    }

    /// Id the credential store files this user's records under.
    pub fn principal_id(&self) -> Option<&str> {
        self.claims.principal_id()
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.claims.name.as_deref()
    }

    pub fn needs_refresh(&self) -> bool {
        self.tokens
            .is_expired_at(Utc::now(), Duration::seconds(REFRESH_LEEWAY_SECS))
    }
}

/// Holds the current session, if any.
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<Option<Arc<AuthSession>>>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self { provider, state }
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn current(&self) -> Option<Arc<AuthSession>> {
        self.state.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<AuthSession>>> {
        self.state.subscribe()
    }

    fn publish(&self, session: Option<Arc<AuthSession>>) {
        self.state.send_modify(|s| *s = session);
    }

    fn require(&self) -> Result<Arc<AuthSession>, CoreError> {
        self.current().ok_or(CoreError::NotAuthenticated)
    }

    /// Adopt tokens obtained earlier (e.g. persisted by the CLI).
    pub fn restore(&self, tokens: SessionTokens) -> Result<Arc<AuthSession>, CoreError> {
        let session = Arc::new(AuthSession::from_tokens(tokens)?);
        debug!(user = ?session.principal_id(), "session restored");
        self.publish(Some(Arc::clone(&session)));
        Ok(session)
    }

    /// ID token for calls to the dashboard's own backend.
    ///
    /// Fails fast with [`CoreError::NotAuthenticated`] so no request is
    /// ever sent without one.
    pub fn id_token(&self) -> Result<SecretString, CoreError> {
        Ok(self.require()?.tokens.id_token.clone())
    }

    /// The current session, refreshed first if it is about to expire.
    pub async fn ensure_fresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<AuthSession>, CoreError> {
        let session = self.require()?;
        if !session.needs_refresh() {
            return Ok(session);
        }

        let Some(refresh_token) = session.tokens.refresh_token.clone() else {
            warn!("session expired and cannot be refreshed");
            self.publish(None);
            return Err(CoreError::NotAuthenticated);
        };

        let mut tokens = self.provider.refresh(&refresh_token, cancel).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token);
        }
        let refreshed = Arc::new(AuthSession::from_tokens(tokens)?);
        debug!(expires_at = %refreshed.tokens.expires_at(), "session refreshed");
        self.publish(Some(Arc::clone(&refreshed)));
        Ok(refreshed)
    }

    // ── Sign in / out ────────────────────────────────────────────────

    pub async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Arc<AuthSession>, CoreError> {
        let tokens = self.provider.sign_in(username, password, cancel).await?;
        let session = Arc::new(AuthSession::from_tokens(tokens)?);
        info!(user = ?session.principal_id(), "signed in");
        self.publish(Some(Arc::clone(&session)));
        Ok(session)
    }

    /// End the session. Local state is cleared even when the provider
    /// call fails; the provider error is still returned.
    pub async fn sign_out(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        self.publish(None);
        info!(user = ?session.principal_id(), "signed out");
        self.provider
            .sign_out(&session.tokens.access_token, cancel)
            .await?;
        Ok(())
    }

    // ── Anonymous account operations ─────────────────────────────────

    pub async fn sign_up(
        &self,
        username: &str,
        password: &SecretString,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<SignUpOutcome, CoreError> {
        Ok(self
            .provider
            .sign_up(username, password, attributes, cancel)
            .await?)
    }

    pub async fn confirm_registration(
        &self,
        username: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        Ok(self
            .provider
            .confirm_registration(username, code, cancel)
            .await?)
    }

    pub async fn forgot_password(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<CodeDelivery, CoreError> {
        Ok(self.provider.forgot_password(username, cancel).await?)
    }

    pub async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        Ok(self
            .provider
            .confirm_forgot_password(username, code, new_password, cancel)
            .await?)
    }

    // ── Signed-in account operations ─────────────────────────────────

    pub async fn user(&self, cancel: &CancellationToken) -> Result<UserProfile, CoreError> {
        let session = self.ensure_fresh(cancel).await?;
        Ok(self
            .provider
            .get_user(&session.tokens.access_token, cancel)
            .await?)
    }

    pub async fn update_attributes(
        &self,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let session = self.ensure_fresh(cancel).await?;
        Ok(self
            .provider
            .update_user_attributes(&session.tokens.access_token, attributes, cancel)
            .await?)
    }

    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let session = self.ensure_fresh(cancel).await?;
        Ok(self
            .provider
            .change_password(&session.tokens.access_token, old_password, new_password, cancel)
            .await?)
    }
}
