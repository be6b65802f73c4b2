// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Whether the default claim descriptor loads.
    pub base_descriptor: String,
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 otherwise. The base descriptor
/// check catches the most common deployment mistake, a missing or
/// malformed `base_api_key.yaml`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let base_descriptor = match state.engine.store().load_default() {
        Ok(_) => "ok".to_string(),
        Err(e) => e.to_string(),
    };

    let all_ok = base_descriptor == "ok";
    let response = HealthResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            base_descriptor,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_is_ok_with_base_descriptor_present() {
        let (state, _dir) = AppState::for_tests();
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.base_descriptor, "ok");
    }

    #[tokio::test]
    async fn health_degrades_without_base_descriptor() {
        let (state, dir) = AppState::for_tests();
        std::fs::remove_file(dir.path().join("api_keys/base_api_key.yaml")).unwrap();

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
    }
}
