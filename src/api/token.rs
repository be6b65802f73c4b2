// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance and introspection handlers.
//!
//! `POST /token` is the heart of the service: it authenticates the user,
//! resolves the claim descriptor named by `api_key` (or supplied inline as
//! `api_key_config`), and embeds the resolved claims in a signed access
//! token.

use axum::{extract::State, Json};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    auth::{Auth, AuthError, Identity},
    claims::{MissingReference, ResolutionContext},
    error::ApiError,
    models::{
        DecodeRequest, ProtectedResponse, RefreshRequest, RefreshResponse, TokenRequest,
        TokenResponse,
    },
    state::AppState,
    token::TokenUse,
};

/// Build the resolution context for an authenticated user.
fn resolution_context(identity: &Identity, internal_token: &str) -> ResolutionContext {
    ResolutionContext::new()
        .with("user_id", identity.username.clone())
        .with("email", identity.email.clone())
        .with("groups", identity.groups.clone())
        .with("roles", identity.roles.clone())
        .with("team_id", identity.team_id())
        .with("internal_token", internal_token)
}

/// Claims derived from the authenticated identity itself.
///
/// Descriptor claims are merged on top and may shadow these; the
/// registered claims (`sub`, `exp`, ...) are still owned by the signer
/// and can never be forged through a descriptor.
fn identity_claims(identity: &Identity) -> Map<String, Value> {
    let mut claims = Map::new();
    claims.insert("name".to_string(), Value::from(identity.name.clone()));
    claims.insert("email".to_string(), Value::from(identity.email.clone()));
    claims.insert("groups".to_string(), Value::from(identity.groups.clone()));
    claims.insert("roles".to_string(), Value::from(identity.roles.clone()));
    claims.insert("team_id".to_string(), Value::from(identity.team_id()));
    claims
}

#[utoipa::path(
    post,
    path = "/token",
    request_body = TokenRequest,
    tag = "Tokens",
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Invalid claim descriptor")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identity = state
        .authenticator
        .authenticate(&request.username, &request.password)
        .map_err(|e| ApiError::new(e.status_code(), e.to_string()))?;

    let ctx = resolution_context(&identity, &state.internal_token);

    // Plain key references fall back to the base descriptor when the file
    // is missing; an inline descriptor is authoritative and never falls
    // back.
    let resolution = state
        .engine
        .resolve_claims(
            request.api_key_config,
            request.api_key.as_deref(),
            MissingReference::FallBackToDefault,
            &ctx,
        )
        .await?;

    let mut claims = identity_claims(&identity);
    for (name, value) in resolution.claims {
        claims.insert(name, value);
    }
    if let Some(id) = &resolution.descriptor_id {
        claims.insert("api_key_id".to_string(), Value::from(id.clone()));
    }

    info!(
        username = %identity.username,
        api_key_id = resolution.descriptor_id.as_deref().unwrap_or(""),
        claim_count = claims.len(),
        "issuing token pair"
    );

    let access_token = state.signer.issue_access(&identity.username, &claims)?;
    let refresh_token = state.signer.issue_refresh(&identity.username, &Map::new())?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    tag = "Tokens",
    responses(
        (status = 200, body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let verified = state
        .signer
        .verify(&request.refresh_token, TokenUse::Refresh)?;

    // Refreshed access tokens carry registered claims only; clients that
    // need fresh descriptor claims log in again.
    let access_token = state.signer.issue_access(&verified.subject, &Map::new())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[utoipa::path(
    post,
    path = "/decode",
    request_body = DecodeRequest,
    tag = "Tokens",
    responses(
        (status = 200, description = "Decoded token payload"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn decode_token(
    State(state): State<AppState>,
    Json(request): Json<DecodeRequest>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let payload = state.signer.decode(&request.token)?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/protected",
    tag = "Tokens",
    security(("bearer" = [])),
    responses(
        (status = 200, body = ProtectedResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn protected(Auth(token): Auth) -> Result<Json<ProtectedResponse>, AuthError> {
    Ok(Json(ProtectedResponse {
        logged_in_as: token.subject,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn login(username: &str, password: &str) -> TokenRequest {
        TokenRequest {
            username: username.to_string(),
            password: password.to_string(),
            api_key: None,
            api_key_config: None,
        }
    }

    #[tokio::test]
    async fn issue_token_with_base_descriptor() {
        let (state, _dir) = AppState::for_tests();

        let Json(pair) = issue_token(State(state.clone()), Json(login("alice", "password")))
            .await
            .expect("token issued");

        let payload = state.signer.decode(&pair.access_token).unwrap();
        assert_eq!(payload["sub"], json!("alice"));
        assert_eq!(payload["team_id"], json!("ai-team"));
        assert_eq!(payload["tier"], json!("basic"));
        assert_eq!(payload["api_key_id"], json!("base_api_key"));
    }

    #[tokio::test]
    async fn issue_token_rejects_bad_password() {
        let (state, _dir) = AppState::for_tests();

        let err = issue_token(State(state), Json(login("alice", "wrong")))
            .await
            .expect_err("login must fail");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_api_key_falls_back_to_base_descriptor() {
        let (state, _dir) = AppState::for_tests();

        let mut request = login("alice", "password");
        request.api_key = Some("no-such-key".to_string());

        let Json(pair) = issue_token(State(state.clone()), Json(request))
            .await
            .expect("token issued");

        let payload = state.signer.decode(&pair.access_token).unwrap();
        assert_eq!(payload["api_key_id"], json!("base_api_key"));
    }

    #[tokio::test]
    async fn inline_descriptor_wins_and_cannot_forge_identity() {
        let (state, _dir) = AppState::for_tests();

        let mut request = login("alice", "password");
        request.api_key_config = Some(
            serde_json::from_value(json!({
                "id": "inline-key",
                "claims": {
                    "static": {"tier": "gold", "sub": "mallory"}
                }
            }))
            .unwrap(),
        );

        let Json(pair) = issue_token(State(state.clone()), Json(request))
            .await
            .expect("token issued");

        let payload = state.signer.decode(&pair.access_token).unwrap();
        assert_eq!(payload["tier"], json!("gold"));
        assert_eq!(payload["api_key_id"], json!("inline-key"));
        // Registered claims always win over descriptor claims.
        assert_eq!(payload["sub"], json!("alice"));
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token() {
        let (state, _dir) = AppState::for_tests();

        let Json(pair) = issue_token(State(state.clone()), Json(login("alice", "password")))
            .await
            .expect("token issued");

        let Json(refreshed) = refresh_token(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: pair.refresh_token,
            }),
        )
        .await
        .expect("refresh succeeds");

        let payload = state.signer.decode(&refreshed.access_token).unwrap();
        assert_eq!(payload["sub"], json!("alice"));
        assert_eq!(payload["token_use"], json!("access"));
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let (state, _dir) = AppState::for_tests();

        let Json(pair) = issue_token(State(state.clone()), Json(login("alice", "password")))
            .await
            .expect("token issued");

        let err = refresh_token(
            State(state),
            Json(RefreshRequest {
                refresh_token: pair.access_token,
            }),
        )
        .await
        .expect_err("access token must be rejected");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn decode_returns_full_payload() {
        let (state, _dir) = AppState::for_tests();

        let Json(pair) = issue_token(State(state.clone()), Json(login("alice", "password")))
            .await
            .expect("token issued");

        let Json(payload) = decode_token(
            State(state),
            Json(DecodeRequest {
                token: pair.access_token,
            }),
        )
        .await
        .expect("decode succeeds");

        assert_eq!(payload["sub"], json!("alice"));
        assert!(payload.contains_key("jti"));
        assert!(payload.contains_key("exp"));
    }

    #[tokio::test]
    async fn decode_rejects_garbage() {
        let (state, _dir) = AppState::for_tests();

        let err = decode_token(
            State(state),
            Json(DecodeRequest {
                token: "not-a-jwt".to_string(),
            }),
        )
        .await
        .expect_err("garbage must be rejected");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
