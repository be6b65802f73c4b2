// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Covers both credential checks during login and bearer-token
/// verification on protected routes.
#[derive(Debug)]
pub enum AuthError {
    /// Username unknown or password digest mismatch
    InvalidCredentials,
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token has expired
    TokenExpired,
    /// Token is malformed, mis-signed, or of the wrong use
    InvalidToken(String),
    /// The user directory could not be read
    Backend(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Backend(_) => "auth_backend_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::TokenExpired
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            AuthError::Backend(msg) => write!(f, "Authentication backend error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<crate::token::TokenError> for AuthError {
    fn from(err: crate::token::TokenError) -> Self {
        match err {
            crate::token::TokenError::Expired => AuthError::TokenExpired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn invalid_credentials_returns_401() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "invalid_credentials");
    }

    #[tokio::test]
    async fn backend_failure_returns_500() {
        let response = AuthError::Backend("users file unreadable".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
