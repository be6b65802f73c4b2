// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request resolution context.
//!
//! The context is the read-only scope that placeholder substitution and
//! formula evaluation draw from. It is assembled once from the authenticated
//! principal and the request body, then never mutated during resolution.

use serde_json::{Map, Value};

/// Identity and request facts available to `{placeholder}` substitution and
/// formula scopes.
///
/// Well-known names: `user_id`, `email`, `groups`, `roles`, `team_id`,
/// `api_key`, `api_key_id`, `internal_token`. Any additional fields the
/// caller's identity provides are carried verbatim; a name absent from the
/// context fails only the claim that references it.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    values: Map<String, Value>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used while assembling the context.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The full context mapping, for building formula scopes.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
