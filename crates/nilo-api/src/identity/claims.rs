// JWT claim decoding
//
// Reads the payload segment of an identity token without verifying the
// signature. The credential store does the same to find the owning user;
// clients only need it to display who is signed in.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Error;

/// The claims the dashboard reads from an ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, rename = "cognito:username")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the claims of a compact JWT (`header.payload.signature`).
    pub fn decode(token: &str) -> Result<Self, Error> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidToken("expected three dot-separated segments".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("payload is not a JSON object: {e}")))
    }

    /// The principal the credential store keys records by: the
    /// provider username, falling back to the subject.
    pub fn principal_id(&self) -> Option<&str> {
        non_empty(self.username.as_deref()).or_else(|| non_empty(self.sub.as_deref()))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

fn non_empty(claim: Option<&str>) -> Option<&str> {
    claim.filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE;

    use super::*;

    fn token(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn username_claim_wins_over_subject() {
        let claims =
            TokenClaims::decode(&token(r#"{"sub":"abc-123","cognito:username":"ada","exp":60}"#))
                .unwrap();
        assert_eq!(claims.principal_id(), Some("ada"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 60);
    }

    #[test]
    fn subject_is_the_fallback_principal() {
        let claims = TokenClaims::decode(&token(r#"{"sub":"abc-123"}"#)).unwrap();
        assert_eq!(claims.principal_id(), Some("abc-123"));
    }

    #[test]
    fn empty_username_falls_back_to_subject() {
        let claims =
            TokenClaims::decode(&token(r#"{"sub":"abc-123","cognito:username":""}"#)).unwrap();
        assert_eq!(claims.principal_id(), Some("abc-123"));

        let neither = TokenClaims::decode(&token(r#"{"sub":"","cognito:username":""}"#)).unwrap();
        assert_eq!(neither.principal_id(), None);
    }

    #[test]
    fn padded_payload_is_tolerated() {
        let padded = format!("h.{}.s", URL_SAFE.encode(r#"{"sub":"x"}"#));
        assert_eq!(TokenClaims::decode(&padded).unwrap().sub.as_deref(), Some("x"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            TokenClaims::decode("not-a-jwt"),
            Err(Error::InvalidToken(_))
        ));
        assert!(matches!(
            TokenClaims::decode("a.!!!.c"),
            Err(Error::InvalidToken(_))
        ));
    }
}
