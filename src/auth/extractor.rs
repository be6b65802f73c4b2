// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require a valid access token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(token): Auth) -> impl IntoResponse {
//!     // token.subject is the authenticated username
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;
use crate::state::AppState;
use crate::token::{TokenUse, VerifiedToken};

/// Extractor for authenticated requests.
///
/// Pulls the bearer token from the `Authorization` header and verifies
/// it as an access token against the application's signing key.
pub struct Auth(pub VerifiedToken);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let verified = state.signer.verify(token, TokenUse::Access)?;

        Ok(Auth(verified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn test_state() -> (AppState, tempfile::TempDir) {
        crate::state::AppState::for_tests()
    }

    fn parts_with_header(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (state, _dir) = test_state();
        let mut parts = parts_with_header(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() {
        let (state, _dir) = test_state();
        let mut parts = parts_with_header(Some("Basic dXNlcjpwYXNz".into()));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn valid_access_token_is_accepted() {
        let (state, _dir) = test_state();
        let token = state
            .signer
            .issue_access("alice", &serde_json::Map::new())
            .unwrap();
        let mut parts = parts_with_header(Some(format!("Bearer {token}")));

        let verified = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(verified.0.subject, "alice");
    }

    #[tokio::test]
    async fn refresh_token_is_rejected_on_protected_routes() {
        let (state, _dir) = test_state();
        let token = state
            .signer
            .issue_refresh("alice", &serde_json::Map::new())
            .unwrap();
        let mut parts = parts_with_header(Some(format!("Bearer {token}")));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
