// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Final claim merge.
//!
//! Combines static claims with the dynamic outcomes into the flat mapping
//! that gets embedded in the token. Static claims are included
//! unconditionally; a successful dynamic claim overwrites a static claim of
//! the same name (it is declared later and presumed more specific). Failed
//! claims are simply absent from the output unless marked `required`, in
//! which case the whole request fails; the caller never sees a partial
//! value silently swapped in.

use serde_json::{Map, Value};
use tracing::warn;

use super::dispatch::ClaimOutcome;
use super::error::ResolveError;

/// The flat claim mapping handed to the token issuer.
pub type ResolvedClaims = Map<String, Value>;

/// Merge static claims and dynamic outcomes per the override policy.
pub fn merge(
    static_claims: &Map<String, Value>,
    outcomes: Vec<ClaimOutcome>,
) -> Result<ResolvedClaims, ResolveError> {
    let mut claims = static_claims.clone();

    for outcome in outcomes {
        match outcome.result {
            Ok(value) => {
                claims.insert(outcome.name, value);
            }
            Err(error) if outcome.required => {
                return Err(ResolveError::RequiredClaimFailed {
                    name: outcome.name,
                    source: error,
                });
            }
            Err(error) => {
                warn!(
                    claim = outcome.name,
                    kind = outcome.kind,
                    %error,
                    "omitting failed best-effort claim"
                );
            }
        }
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::error::ClaimError;
    use serde_json::json;

    fn static_claims(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn ok(name: &str, value: Value) -> ClaimOutcome {
        ClaimOutcome {
            name: name.to_string(),
            kind: "function",
            required: false,
            result: Ok(value),
        }
    }

    fn failed(name: &str, required: bool) -> ClaimOutcome {
        ClaimOutcome {
            name: name.to_string(),
            kind: "function",
            required,
            result: Err(ClaimError::FunctionExecution("boom".to_string())),
        }
    }

    #[test]
    fn no_dynamic_claims_yields_exactly_the_static_claims() {
        let statics = static_claims(&[("tier", json!("standard")), ("rate_limit", json!(10))]);
        let merged = merge(&statics, vec![]).expect("merge");
        assert_eq!(merged, statics);
    }

    #[test]
    fn dynamic_claim_wins_name_collision() {
        let statics = static_claims(&[("tier", json!("standard"))]);
        let merged = merge(&statics, vec![ok("tier", json!("enterprise"))]).expect("merge");
        assert_eq!(merged["tier"], json!("enterprise"));
    }

    #[test]
    fn failed_best_effort_claim_is_omitted() {
        let statics = static_claims(&[("tier", json!("standard"))]);
        let merged = merge(
            &statics,
            vec![failed("quota", false), ok("usage", json!(42))],
        )
        .expect("merge");

        assert!(!merged.contains_key("quota"));
        assert_eq!(merged["usage"], json!(42));
        assert_eq!(merged["tier"], json!("standard"));
    }

    #[test]
    fn failed_required_claim_aborts_the_merge() {
        let result = merge(&Map::new(), vec![failed("quota", true)]);
        match result {
            Err(ResolveError::RequiredClaimFailed { name, .. }) => assert_eq!(name, "quota"),
            other => panic!("expected required-claim failure, got {other:?}"),
        }
    }
}
