// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::claims::ResolveError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match &err {
            ResolveError::ConfigNotFound(_) => Self::not_found(err.to_string()),
            ResolveError::InvalidConfigSchema(_) => Self::unprocessable(err.to_string()),
            ResolveError::RequiredClaimFailed { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl From<crate::token::TokenError> for ApiError {
    fn from(err: crate::token::TokenError) -> Self {
        match &err {
            crate::token::TokenError::Signing(_) => Self::internal(err.to_string()),
            _ => Self::unauthorized(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unauthorized = ApiError::unauthorized("no token");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn resolve_errors_map_to_statuses() {
        let missing = ApiError::from(ResolveError::ConfigNotFound("base_api_key".into()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let schema = ApiError::from(ResolveError::InvalidConfigSchema("bad yaml".into()));
        assert_eq!(schema.status, StatusCode::UNPROCESSABLE_ENTITY);

        let required = ApiError::from(ResolveError::RequiredClaimFailed {
            name: "quota".into(),
            source: crate::claims::ClaimError::FunctionExecution("boom".into()),
        });
        assert_eq!(required.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
