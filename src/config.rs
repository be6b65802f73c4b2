// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET_KEY` | HMAC secret for token signing | Required |
//! | `API_KEYS_DIR` | Directory holding claim descriptor YAML files | `api_keys` |
//! | `USERS_FILE` | YAML user directory for password auth | `users.yaml` |
//! | `INTERNAL_API_TOKEN` | Token exposed to descriptors as `{internal_token}` | empty |
//! | `TLS_CERT_FILE` | PEM certificate; with `TLS_KEY_FILE`, enables HTTPS | Optional |
//! | `TLS_KEY_FILE` | PEM private key for HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the token signing secret.
///
/// Required at startup; the process refuses to boot without it so a
/// misconfigured deployment cannot silently sign tokens with a default
/// secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";

/// Environment variable name for the claim descriptor directory.
///
/// The directory must contain `base_api_key.yaml`, the descriptor used
/// when a referenced key file is missing.
pub const API_KEYS_DIR_ENV: &str = "API_KEYS_DIR";

/// Environment variable name for the YAML user directory file.
pub const USERS_FILE_ENV: &str = "USERS_FILE";

/// Environment variable name for the internal service token.
///
/// Descriptors reference it as the `{internal_token}` placeholder in
/// `api` claim headers.
pub const INTERNAL_TOKEN_ENV: &str = "INTERNAL_API_TOKEN";

/// Environment variable name for the TLS certificate file (PEM).
pub const TLS_CERT_ENV: &str = "TLS_CERT_FILE";

/// Environment variable name for the TLS private key file (PEM).
pub const TLS_KEY_ENV: &str = "TLS_KEY_FILE";

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default claim descriptor directory, relative to the working directory.
pub const DEFAULT_API_KEYS_DIR: &str = "api_keys";

/// Default users file, relative to the working directory.
pub const DEFAULT_USERS_FILE: &str = "users.yaml";
