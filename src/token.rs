// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT issuance and verification.
//!
//! The claims engine hands this module a finished flat claim mapping; the
//! signer embeds it in an HS256-signed token alongside the registered
//! claims (`sub`, `iat`, `exp`, `jti`, `token_use`). Access tokens live for
//! an hour, refresh tokens for thirty days. Payload encryption (JWE) is
//! deliberately not provided.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::claims::ResolvedClaims;

const ACCESS_TOKEN_TTL_HOURS: i64 = 1;
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Which kind of token a payload represents, carried in `token_use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUse {
    Access,
    Refresh,
}

impl TokenUse {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenUse::Access => "access",
            TokenUse::Refresh => "refresh",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("wrong token type: expected a {expected} token")]
    WrongUse { expected: &'static str },
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// A signature-verified token payload.
#[derive(Debug)]
pub struct VerifiedToken {
    pub subject: String,
    pub payload: Map<String, Value>,
}

/// HS256 signer/verifier with a shared secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access token for `subject` carrying `extra_claims`.
    pub fn issue_access(
        &self,
        subject: &str,
        extra_claims: &ResolvedClaims,
    ) -> Result<String, TokenError> {
        self.issue(subject, extra_claims, TokenUse::Access)
    }

    /// Issue a refresh token for `subject` carrying `extra_claims`.
    pub fn issue_refresh(
        &self,
        subject: &str,
        extra_claims: &ResolvedClaims,
    ) -> Result<String, TokenError> {
        self.issue(subject, extra_claims, TokenUse::Refresh)
    }

    fn issue(
        &self,
        subject: &str,
        extra_claims: &ResolvedClaims,
        use_: TokenUse,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match use_ {
            TokenUse::Access => Duration::hours(ACCESS_TOKEN_TTL_HOURS),
            TokenUse::Refresh => Duration::days(REFRESH_TOKEN_TTL_DAYS),
        };

        // Registered claims overwrite any same-named extra claim; a caller
        // must not be able to forge sub or exp via the descriptor.
        let mut payload = extra_claims.clone();
        payload.insert("sub".to_string(), Value::from(subject));
        payload.insert("iat".to_string(), Value::from(now.timestamp()));
        payload.insert("exp".to_string(), Value::from((now + ttl).timestamp()));
        payload.insert("jti".to_string(), Value::from(Uuid::new_v4().to_string()));
        payload.insert("token_use".to_string(), Value::from(use_.as_str()));

        encode(&Header::default(), &payload, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, and require the expected `token_use`.
    pub fn verify(&self, token: &str, expected: TokenUse) -> Result<VerifiedToken, TokenError> {
        let payload = self.decode(token)?;

        let use_matches = payload
            .get("token_use")
            .and_then(Value::as_str)
            .is_some_and(|u| u == expected.as_str());
        if !use_matches {
            return Err(TokenError::WrongUse {
                expected: expected.as_str(),
            });
        }

        let subject = payload
            .get("sub")
            .and_then(Value::as_str)
            .ok_or_else(|| TokenError::Invalid("missing sub claim".to_string()))?
            .to_string();

        Ok(VerifiedToken { subject, payload })
    }

    /// Verify signature and expiry, returning the raw payload.
    pub fn decode(&self, token: &str) -> Result<Map<String, Value>, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Map<String, Value>>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-key")
    }

    fn extra() -> ResolvedClaims {
        let mut claims = ResolvedClaims::new();
        claims.insert("tier".to_string(), json!("premium"));
        claims.insert("models".to_string(), json!(["gpt-4"]));
        claims
    }

    #[test]
    fn access_token_round_trips_with_extra_claims() {
        let signer = signer();
        let token = signer.issue_access("alice", &extra()).expect("issue");

        let verified = signer.verify(&token, TokenUse::Access).expect("verify");
        assert_eq!(verified.subject, "alice");
        assert_eq!(verified.payload["tier"], json!("premium"));
        assert_eq!(verified.payload["models"], json!(["gpt-4"]));
        assert_eq!(verified.payload["token_use"], json!("access"));
        assert!(verified.payload.contains_key("jti"));
    }

    #[test]
    fn refresh_token_is_rejected_where_access_is_expected() {
        let signer = signer();
        let token = signer.issue_refresh("alice", &extra()).expect("issue");

        assert!(matches!(
            signer.verify(&token, TokenUse::Access),
            Err(TokenError::WrongUse { expected: "access" })
        ));
        assert!(signer.verify(&token, TokenUse::Refresh).is_ok());
    }

    #[test]
    fn descriptor_claims_cannot_forge_registered_claims() {
        let signer = signer();
        let mut sneaky = ResolvedClaims::new();
        sneaky.insert("sub".to_string(), json!("mallory"));
        sneaky.insert("token_use".to_string(), json!("refresh"));

        let token = signer.issue_access("alice", &sneaky).expect("issue");
        let verified = signer.verify(&token, TokenUse::Access).expect("verify");
        assert_eq!(verified.subject, "alice");
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = signer().issue_access("alice", &extra()).expect("issue");
        let other = TokenSigner::new("a-different-secret");
        assert!(matches!(
            other.verify(&token, TokenUse::Access),
            Err(TokenError::Invalid(_))
        ));
    }
}
