// Identity provider client (Cognito user-pool JSON protocol)
//
// Every operation is a POST to the pool endpoint with the operation named
// in `X-Amz-Target`. Errors come back as `{"__type": ..., "message": ...}`
// with a 4xx status.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::{CodeDelivery, IdentityProvider, SessionTokens, SignUpOutcome, UserAttribute, UserProfile};
use crate::error::{Error, preview};
use crate::fetch::{self, RawResponse};
use crate::transport::TransportConfig;

const TARGET_HEADER: &str = "x-amz-target";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const PROTOCOL_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_confirmed: bool,
    #[serde(default)]
    user_sub: Option<String>,
    #[serde(default)]
    code_delivery_details: Option<CodeDelivery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<UserAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ForgotPasswordResponse {
    #[serde(default)]
    code_delivery_details: Option<CodeDelivery>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "__type")]
    kind: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Client for a Cognito-style user pool.
#[derive(Clone)]
pub struct CognitoClient {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
}

impl CognitoClient {
    pub fn new(endpoint: &str, client_id: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTOCOL_CONTENT_TYPE));
        let http = transport.build_client_with_headers(headers)?;
        Self::from_reqwest(endpoint, client_id, http)
    }

    pub fn from_reqwest(
        endpoint: &str,
        client_id: &str,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            client_id: client_id.to_owned(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<T, Error> {
        debug!(operation, "identity provider request");
        let target = HeaderValue::from_str(&format!("{TARGET_PREFIX}.{operation}"))
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;

        // `.json()` would set `application/json`; the protocol wants its own type.
        let request = self
            .http
            .post(self.endpoint.clone())
            .header(TARGET_HEADER, target)
            .header(CONTENT_TYPE, PROTOCOL_CONTENT_TYPE)
            .body(body.to_string());

        let resp = fetch::send(request, cancel).await?;
        if !resp.is_success() {
            return Err(identity_error(resp));
        }
        resp.json()
    }
}

/// Turn an `InitiateAuth` answer into session tokens. Extra challenges
/// (MFA, forced password change) are reported, not handled.
fn session_from(result: InitiateAuthResponse) -> Result<SessionTokens, Error> {
    let Some(auth) = result.authentication_result else {
        let challenge = result.challenge_name.unwrap_or_else(|| "Unknown".into());
        return Err(Error::Identity {
            code: challenge.clone(),
            message: format!("sign-in requires the {challenge} challenge, which is not supported"),
        });
    };

    Ok(SessionTokens {
        id_token: SecretString::from(auth.id_token),
        access_token: SecretString::from(auth.access_token),
        refresh_token: auth.refresh_token.map(SecretString::from),
        expires_in: auth.expires_in,
        issued_at: Utc::now(),
    })
}

/// Map a 4xx/5xx protocol response to `Error::Identity`.
fn identity_error(resp: RawResponse) -> Error {
    let parsed: ErrorBody = serde_json::from_str(&resp.body).unwrap_or_default();
    match parsed.kind {
        Some(kind) => Error::Identity {
            // `com.amazonaws...#NotAuthorizedException` -> `NotAuthorizedException`
            code: kind.rsplit('#').next().unwrap_or(&kind).to_owned(),
            message: parsed.message.unwrap_or_else(|| preview(&resp.body).to_owned()),
        },
        None => resp.into_status_error(),
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn sign_up(
        &self,
        username: &str,
        password: &SecretString,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<SignUpOutcome, Error> {
        let body = json!({
            "ClientId": self.client_id,
            "Username": username,
            "Password": password.expose_secret(),
            "UserAttributes": attributes,
        });
        let resp: SignUpResponse = self.call("SignUp", &body, cancel).await?;
        info!(username, confirmed = resp.user_confirmed, "account registered");
        Ok(SignUpOutcome {
            user_sub: resp.user_sub,
            confirmed: resp.user_confirmed,
            delivery: resp.code_delivery_details,
        })
    }

    async fn confirm_registration(
        &self,
        username: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let body = json!({
            "ClientId": self.client_id,
            "Username": username,
            "ConfirmationCode": code,
        });
        let _: IgnoredAny = self.call("ConfirmSignUp", &body, cancel).await?;
        Ok(())
    }

    async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<SessionTokens, Error> {
        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": username,
                "PASSWORD": password.expose_secret(),
            },
        });
        let resp = self.call("InitiateAuth", &body, cancel).await?;
        let tokens = session_from(resp)?;
        info!(username, "signed in");
        Ok(tokens)
    }

    async fn refresh(
        &self,
        refresh_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<SessionTokens, Error> {
        let body = json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": { "REFRESH_TOKEN": refresh_token.expose_secret() },
        });
        let resp = self.call("InitiateAuth", &body, cancel).await?;
        let mut tokens = session_from(resp)?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.clone());
        }
        debug!("session refreshed");
        Ok(tokens)
    }

    async fn sign_out(
        &self,
        access_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let body = json!({ "AccessToken": access_token.expose_secret() });
        let _: IgnoredAny = self.call("GlobalSignOut", &body, cancel).await?;
        info!("signed out");
        Ok(())
    }

    async fn get_user(
        &self,
        access_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<UserProfile, Error> {
        let body = json!({ "AccessToken": access_token.expose_secret() });
        let resp: GetUserResponse = self.call("GetUser", &body, cancel).await?;
        Ok(UserProfile {
            username: resp.username,
            attributes: resp.user_attributes,
        })
    }

    async fn update_user_attributes(
        &self,
        access_token: &SecretString,
        attributes: &[UserAttribute],
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let body = json!({
            "AccessToken": access_token.expose_secret(),
            "UserAttributes": attributes,
        });
        let _: IgnoredAny = self.call("UpdateUserAttributes", &body, cancel).await?;
        Ok(())
    }

    async fn change_password(
        &self,
        access_token: &SecretString,
        old_password: &SecretString,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let body = json!({
            "AccessToken": access_token.expose_secret(),
            "PreviousPassword": old_password.expose_secret(),
            "ProposedPassword": new_password.expose_secret(),
        });
        let _: IgnoredAny = self.call("ChangePassword", &body, cancel).await?;
        Ok(())
    }

    async fn forgot_password(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<CodeDelivery, Error> {
        let body = json!({
            "ClientId": self.client_id,
            "Username": username,
        });
        let resp: ForgotPasswordResponse = self.call("ForgotPassword", &body, cancel).await?;
        Ok(resp.code_delivery_details.unwrap_or_default())
    }

    async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let body = json!({
            "ClientId": self.client_id,
            "Username": username,
            "ConfirmationCode": code,
            "Password": new_password.expose_secret(),
        });
        let _: IgnoredAny = self.call("ConfirmForgotPassword", &body, cancel).await?;
        Ok(())
    }
}
