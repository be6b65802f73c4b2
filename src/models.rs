// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Token issuance**: login request plus access/refresh token pair
//! - **Token introspection**: refresh, decode, and protected-route echoes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::claims::ConfigDescriptor;

// =============================================================================
// Token Issuance Models
// =============================================================================

/// Request to exchange credentials for a token pair.
///
/// `api_key` names a stored claim descriptor; `api_key_config` carries a
/// full descriptor inline. When both are present the inline descriptor
/// wins and the reference is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
    /// Reference to a stored claim descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Inline claim descriptor, takes precedence over `api_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_config: Option<ConfigDescriptor>,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

// =============================================================================
// Token Introspection Models
// =============================================================================

/// Request to mint a new access token from a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response carrying the refreshed access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Request to decode a token and return its payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecodeRequest {
    pub token: String,
}

/// Response for the authenticated echo route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProtectedResponse {
    pub logged_in_as: String,
}
