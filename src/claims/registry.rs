// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Build-time registry of claim functions.
//!
//! `function`-kind dynamic claims name a handler by `(module, function)`
//! strings. Handlers live in a closed table assembled at startup; there is
//! no dynamic code loading. Requests share the registry by reference and
//! never mutate it, so concurrent lookups are safe.
//!
//! Handlers receive their substituted arguments plus the descriptor's
//! `metadata` block as auxiliary lookup data. Whatever they return becomes
//! the claim value; metadata itself never reaches the output claims.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

/// Error returned by a claim function. Mapped to a per-claim
/// `FunctionExecutionError` by the dispatcher.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FunctionError(pub String);

impl FunctionError {
    fn missing_arg(name: &str) -> Self {
        FunctionError(format!("missing required argument '{name}'"))
    }
}

/// A registered claim function. Implementations must be pure with respect
/// to process state: same arguments, same result.
pub trait ClaimFunction: Send + Sync {
    fn call(
        &self,
        args: &Map<String, Value>,
        metadata: &Map<String, Value>,
    ) -> Result<Value, FunctionError>;
}

/// Closed lookup table from `(module, function)` to handler.
///
/// The key stays a tuple rather than a joined string: module paths
/// contain dots themselves, so `("a.b", "c")` and `("a", "b.c")` must
/// stay distinct.
pub struct FunctionRegistry {
    handlers: HashMap<(String, String), Arc<dyn ClaimFunction>>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The registry with all built-in handlers.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("claims.quota", "get_remaining_quota", RemainingQuota);
        registry.register("claims.permissions", "get_team_permissions", TeamPermissions);
        registry.register("claims.access", "check_model_access", ModelAccess);
        registry.register("claims.group_category", "get_user_category", GroupCategory);
        registry
    }

    pub fn register(
        &mut self,
        module: &str,
        function: &str,
        handler: impl ClaimFunction + 'static,
    ) {
        self.handlers
            .insert((module.to_string(), function.to_string()), Arc::new(handler));
    }

    pub fn get(&self, module: &str, function: &str) -> Option<&Arc<dyn ClaimFunction>> {
        self.handlers
            .get(&(module.to_string(), function.to_string()))
    }
}

fn string_arg(args: &Map<String, Value>, name: &str) -> Result<String, FunctionError> {
    match args.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(FunctionError(format!(
            "argument '{name}' must be a non-empty string, got {other}"
        ))),
        None => Err(FunctionError::missing_arg(name)),
    }
}

// --- built-in handlers -------------------------------------------------

/// `claims.quota::get_remaining_quota(user_id)`
///
/// Remaining token quota for a user. Stands in for a quota service lookup.
struct RemainingQuota;

impl ClaimFunction for RemainingQuota {
    fn call(
        &self,
        args: &Map<String, Value>,
        _metadata: &Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        let user_id = string_arg(args, "user_id")?;
        tracing::debug!(%user_id, "resolving remaining quota");

        Ok(json!({
            "remaining_tokens": 10_000,
            "reset_date": "2025-06-01"
        }))
    }
}

/// `claims.permissions::get_team_permissions(team_id, api_key_id)`
///
/// Per-team permission map, keyed by team id.
struct TeamPermissions;

impl ClaimFunction for TeamPermissions {
    fn call(
        &self,
        args: &Map<String, Value>,
        _metadata: &Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        let team_id = string_arg(args, "team_id")?;
        let api_key_id = string_arg(args, "api_key_id")?;
        tracing::debug!(%team_id, %api_key_id, "resolving team permissions");

        let permissions = match team_id.as_str() {
            "admin-team" => json!({
                "can_manage_users": true,
                "can_create_api_keys": true,
                "can_view_billing": true,
                "max_models_per_request": 5
            }),
            "ai-team" => json!({
                "can_manage_users": false,
                "can_create_api_keys": false,
                "can_view_billing": false,
                "max_models_per_request": 3
            }),
            "ml-team" => json!({
                "can_manage_users": false,
                "can_create_api_keys": false,
                "can_view_billing": false,
                "max_models_per_request": 2
            }),
            _ => json!({
                "can_manage_users": false,
                "can_create_api_keys": false,
                "can_view_billing": false,
                "max_models_per_request": 1
            }),
        };
        Ok(permissions)
    }
}

/// `claims.access::check_model_access(api_key_id)`
///
/// Which models a key grants access to, with a restriction flag.
struct ModelAccess;

impl ClaimFunction for ModelAccess {
    fn call(
        &self,
        args: &Map<String, Value>,
        _metadata: &Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        let api_key_id = string_arg(args, "api_key_id")?;

        let models: Vec<&str> = match api_key_id.as_str() {
            "groq-service" => vec!["llama3-70b", "llama3-8b", "mixtral-8x7b"],
            "openai-service" => vec!["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo"],
            "full-access" => vec!["gpt-4", "llama3-70b", "claude-3-opus", "claude-3-sonnet"],
            _ => vec!["gpt-3.5-turbo"],
        };

        Ok(json!({
            "available_models": models,
            "is_restricted": models.len() < 3
        }))
    }
}

/// `claims.group_category::get_user_category(user_groups, lookup_mode)`
///
/// Assigns the user to a category from `metadata.categories`, matching the
/// user's groups against each category's `groups` list. `lookup_mode` is
/// `FIRST_MATCH` (default), `ALL_MATCHES`, or `TIERED_MATCH` (highest
/// `tier` wins).
struct GroupCategory;

impl ClaimFunction for GroupCategory {
    fn call(
        &self,
        args: &Map<String, Value>,
        metadata: &Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        let user_groups: Vec<String> = match args.get("user_groups") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(other) => {
                return Err(FunctionError(format!(
                    "argument 'user_groups' must be a sequence, got {other}"
                )))
            }
            None => return Err(FunctionError::missing_arg("user_groups")),
        };
        let lookup_mode = args
            .get("lookup_mode")
            .and_then(Value::as_str)
            .unwrap_or("FIRST_MATCH");

        let Some(Value::Object(categories)) = metadata.get("categories") else {
            return Ok(json!({
                "categories": [],
                "match_mode": lookup_mode,
                "reason": "No categories in metadata"
            }));
        };

        let mut matches: Vec<Value> = Vec::new();
        for (name, category) in categories {
            let category_groups = category
                .get("groups")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let hit = category_groups
                .iter()
                .filter_map(Value::as_str)
                .any(|g| user_groups.iter().any(|ug| ug == g));
            if hit {
                let mut entry = Map::new();
                entry.insert("name".to_string(), json!(name));
                if let Value::Object(fields) = category {
                    for (k, v) in fields {
                        entry.insert(k.clone(), v.clone());
                    }
                }
                matches.push(Value::Object(entry));
            }
        }

        let result = match lookup_mode {
            "FIRST_MATCH" => match matches.first() {
                Some(first) => json!({"category": first, "match_mode": lookup_mode}),
                None => json!({"category": null, "match_mode": lookup_mode, "reason": "No match"}),
            },
            "ALL_MATCHES" => json!({"categories": matches, "match_mode": lookup_mode}),
            "TIERED_MATCH" => {
                let best = matches.iter().max_by_key(|m| {
                    m.get("tier").and_then(Value::as_i64).unwrap_or(0)
                });
                match best {
                    Some(best) => json!({"category": best, "match_mode": lookup_mode}),
                    None => {
                        json!({"category": null, "match_mode": lookup_mode, "reason": "No match"})
                    }
                }
            }
            other => json!({
                "categories": matches,
                "match_mode": other,
                "reason": "Unknown lookup_mode"
            }),
        };
        Ok(result)
    }
}
