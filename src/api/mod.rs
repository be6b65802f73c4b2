// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        DecodeRequest, ProtectedResponse, RefreshRequest, RefreshResponse, TokenRequest,
        TokenResponse,
    },
    state::AppState,
};

pub mod health;
pub mod token;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/token", post(token::issue_token))
        .route("/refresh", post(token::refresh_token))
        .route("/decode", post(token::decode_token))
        .route("/protected", get(token::protected))
        .route("/health", get(health::health))
        .with_state(state);

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        token::issue_token,
        token::refresh_token,
        token::decode_token,
        token::protected,
        health::health
    ),
    components(
        schemas(
            TokenRequest,
            TokenResponse,
            RefreshRequest,
            RefreshResponse,
            DecodeRequest,
            ProtectedResponse,
            crate::claims::ConfigDescriptor,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Tokens", description = "Token issuance, refresh, and introspection"),
        (name = "Health", description = "Service health checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = AppState::for_tests();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
