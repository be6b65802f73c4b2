// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TokenForge - API-Key-Driven JWT Issuance Service
//!
//! This crate issues JWTs whose claims are resolved at login time from
//! per-key configuration descriptors: static values, registered claim
//! functions, external HTTP lookups, and formula expressions.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password authentication and bearer-token extraction
//! - `claims` - Claims resolution engine (descriptors, dispatch, formulas)
//! - `token` - HS256 token signing and verification

pub mod api;
pub mod auth;
pub mod claims;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod token;
