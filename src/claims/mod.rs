// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Claims Resolution Engine
//!
//! Turns an API key configuration descriptor plus a per-request context
//! into the flat claim mapping embedded in issued tokens.
//!
//! ## Pipeline
//!
//! 1. [`store::resolve_descriptor`] picks the authoritative descriptor
//!    (inline payload > file reference > default).
//! 2. [`placeholder`] substitution injects context values into each dynamic
//!    spec's `args`/`url`/`headers`.
//! 3. [`dispatch::ClaimsDispatcher`] resolves every dynamic claim in
//!    declaration order: registered functions, external HTTP lookups, and
//!    [`formula`] expressions.
//! 4. [`merge::merge`] combines static claims and dynamic results into the
//!    output, dropping failed best-effort claims.
//!
//! The engine never signs or encrypts anything; the token issuer consumes
//! [`ResolvedClaims`] as-is. Resolution is sequential within a request and
//! shares only read-only state (descriptor store, function registry)
//! across requests.

pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod formula;
pub mod merge;
pub mod placeholder;
pub mod registry;
pub mod store;

use std::sync::Arc;

use tracing::debug;

pub use context::ResolutionContext;
pub use descriptor::{ClaimSpec, ConfigDescriptor};
pub use error::{ClaimError, ResolveError};
pub use merge::ResolvedClaims;
pub use registry::FunctionRegistry;
pub use store::{DescriptorStore, MissingReference};

use dispatch::ClaimsDispatcher;

/// Result of one resolution pass.
#[derive(Debug)]
pub struct Resolution {
    pub claims: ResolvedClaims,
    /// Id of the descriptor that drove resolution, when it declares one.
    pub descriptor_id: Option<String>,
}

/// Process-wide claims engine: descriptor store, function registry, and the
/// shared HTTP client for `api` claims. Built once at startup; requests
/// share it by reference.
pub struct ClaimsEngine {
    store: DescriptorStore,
    registry: Arc<FunctionRegistry>,
    http: reqwest::Client,
}

impl ClaimsEngine {
    pub fn new(store: DescriptorStore, registry: Arc<FunctionRegistry>) -> Self {
        Self {
            store,
            registry,
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    /// Resolve the final claim mapping for one request.
    ///
    /// The context is extended with the supplied key literal and the
    /// descriptor's id so `{api_key}`/`{api_key_id}` placeholders resolve.
    pub async fn resolve_claims(
        &self,
        inline: Option<ConfigDescriptor>,
        reference: Option<&str>,
        missing: MissingReference,
        ctx: &ResolutionContext,
    ) -> Result<Resolution, ResolveError> {
        let descriptor = store::resolve_descriptor(&self.store, inline, reference, missing)?;
        let descriptor_id = descriptor.id.clone();

        let ctx = ctx
            .clone()
            .with("api_key", reference.unwrap_or("base_api_key"))
            .with("api_key_id", descriptor_id.clone().unwrap_or_default());

        debug!(
            api_key_id = descriptor_id.as_deref().unwrap_or(""),
            static_claims = descriptor.claims.static_claims.len(),
            dynamic_claims = descriptor.claims.dynamic.len(),
            "resolving claims"
        );

        let dispatcher = ClaimsDispatcher::new(self.registry.as_ref(), &self.http);
        let outcomes = dispatcher
            .resolve_all(
                &descriptor.claims.dynamic,
                &descriptor.claims.static_claims,
                &ctx,
                &descriptor.metadata,
            )
            .await;

        let claims = merge::merge(&descriptor.claims.static_claims, outcomes)?;
        Ok(Resolution {
            claims,
            descriptor_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> (ClaimsEngine, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = DescriptorStore::new(dir.path());
        let engine = ClaimsEngine::new(store, Arc::new(FunctionRegistry::builtin()));
        (engine, dir)
    }

    fn ctx() -> ResolutionContext {
        ResolutionContext::new()
            .with("user_id", "alice")
            .with("team_id", "ai-team")
            .with("groups", json!(["ai-team"]))
    }

    #[tokio::test]
    async fn inline_descriptor_resolves_static_and_dynamic_claims() {
        let (engine, _dir) = engine();
        let inline: ConfigDescriptor = serde_json::from_value(json!({
            "id": "inline-key",
            "claims": {
                "static": {"tier": "premium", "rate_limit": 100},
                "dynamic": {
                    "quota": {
                        "type": "function",
                        "module": "claims.quota",
                        "function": "get_remaining_quota",
                        "args": {"user_id": "{user_id}"}
                    },
                    "limits": {
                        "type": "formula",
                        "formulas": {
                            "context_window": "tier == 'premium' ? 4096 : 2048"
                        }
                    }
                }
            },
            "metadata": {"description": "never a claim"}
        }))
        .unwrap();

        let resolution = engine
            .resolve_claims(Some(inline), None, MissingReference::HardFail, &ctx())
            .await
            .expect("resolve");

        assert_eq!(resolution.descriptor_id.as_deref(), Some("inline-key"));
        assert_eq!(resolution.claims["tier"], json!("premium"));
        assert_eq!(resolution.claims["quota"]["remaining_tokens"], json!(10_000));
        assert_eq!(resolution.claims["context_window"], json!(4096));
        // Metadata isolation: no metadata key may surface as a claim.
        assert!(!resolution.claims.contains_key("description"));
        assert!(!resolution.claims.contains_key("metadata"));
    }

    #[tokio::test]
    async fn resolution_is_idempotent_for_pure_handlers() {
        let (engine, _dir) = engine();
        let inline: ConfigDescriptor = serde_json::from_value(json!({
            "claims": {
                "static": {"tier": "standard"},
                "dynamic": {
                    "quota": {
                        "type": "function",
                        "module": "claims.quota",
                        "function": "get_remaining_quota",
                        "args": {"user_id": "{user_id}"}
                    }
                }
            }
        }))
        .unwrap();

        let first = engine
            .resolve_claims(Some(inline.clone()), None, MissingReference::HardFail, &ctx())
            .await
            .expect("resolve");
        let second = engine
            .resolve_claims(Some(inline), None, MissingReference::HardFail, &ctx())
            .await
            .expect("resolve");
        assert_eq!(first.claims, second.claims);
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_and_static_claims() {
        let (engine, _dir) = engine();
        let inline: ConfigDescriptor = serde_json::from_value(json!({
            "claims": {
                "static": {"tier": "standard"},
                "dynamic": {
                    "broken": {
                        "type": "function",
                        "module": "claims.quota",
                        "function": "get_remaining_quota",
                        "args": {"user_id": "{undefined_placeholder}"}
                    },
                    "quota": {
                        "type": "function",
                        "module": "claims.quota",
                        "function": "get_remaining_quota",
                        "args": {"user_id": "{user_id}"}
                    }
                }
            }
        }))
        .unwrap();

        let resolution = engine
            .resolve_claims(Some(inline), None, MissingReference::HardFail, &ctx())
            .await
            .expect("request succeeds despite one failed claim");

        assert!(!resolution.claims.contains_key("broken"));
        assert!(resolution.claims.contains_key("quota"));
        assert_eq!(resolution.claims["tier"], json!("standard"));
    }

    #[tokio::test]
    async fn required_claim_failure_fails_the_request() {
        let (engine, _dir) = engine();
        let inline: ConfigDescriptor = serde_json::from_value(json!({
            "claims": {
                "dynamic": {
                    "must_have": {
                        "type": "function",
                        "module": "claims.nowhere",
                        "function": "nothing",
                        "args": {},
                        "required": true
                    }
                }
            }
        }))
        .unwrap();

        let result = engine
            .resolve_claims(Some(inline), None, MissingReference::HardFail, &ctx())
            .await;
        assert!(matches!(
            result,
            Err(ResolveError::RequiredClaimFailed { .. })
        ));
    }

    #[tokio::test]
    async fn missing_reference_without_fallback_fails() {
        let (engine, _dir) = engine();
        let result = engine
            .resolve_claims(None, Some("ghost"), MissingReference::HardFail, &ctx())
            .await;
        assert!(matches!(result, Err(ResolveError::ConfigNotFound(_))));
    }
}
