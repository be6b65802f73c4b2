// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for claims resolution.
//!
//! Two severities exist:
//!
//! - [`ResolveError`] is fatal to the request: no descriptor could be
//!   resolved, the descriptor is structurally invalid, or a claim marked
//!   `required` failed.
//! - [`ClaimError`] affects a single dynamic claim. The dispatcher catches
//!   it, logs it, and the merger drops the claim from the output.

use super::formula::FormulaError;

/// Per-claim, non-fatal resolution failure. The affected claim is omitted
/// from the output; sibling claims are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// No handler registered for the `(module, function)` pair.
    #[error("no function registered for {module}.{function}")]
    UnknownFunction { module: String, function: String },

    /// A registered handler returned an error.
    #[error("claim function failed: {0}")]
    FunctionExecution(String),

    /// The outbound HTTP call failed (transport error, timeout, or non-2xx).
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// `response_field` did not select a value in the response body.
    #[error("response field '{0}' not found in external response")]
    ResponseFieldNotFound(String),

    /// The formula failed to parse or evaluate.
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    /// A `{placeholder}` consumed by this claim had no value in the
    /// resolution context.
    #[error("unresolved placeholder '{0}'")]
    FailedSubstitution(String),
}

impl ClaimError {
    /// Stable identifier for audit logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::UnknownFunction { .. } => "unknown_function",
            ClaimError::FunctionExecution(_) => "function_execution_error",
            ClaimError::ExternalCall(_) => "external_call_error",
            ClaimError::ResponseFieldNotFound(_) => "response_field_not_found",
            ClaimError::Formula(_) => "formula_error",
            ClaimError::FailedSubstitution(_) => "failed_substitution",
        }
    }
}

/// Fatal resolution failure, surfaced to the caller as a request error.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No descriptor could be resolved for the given source.
    #[error("API key config not found: {0}")]
    ConfigNotFound(String),

    /// The descriptor failed structural validation.
    #[error("invalid API key config: {0}")]
    InvalidConfigSchema(String),

    /// A claim marked `required` failed to resolve.
    #[error("required claim '{name}' failed: {source}")]
    RequiredClaimFailed {
        name: String,
        #[source]
        source: ClaimError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_error_kinds_are_stable() {
        let err = ClaimError::UnknownFunction {
            module: "claims.quota".to_string(),
            function: "missing".to_string(),
        };
        assert_eq!(err.kind(), "unknown_function");
        assert_eq!(
            ClaimError::FailedSubstitution("team_id".to_string()).kind(),
            "failed_substitution"
        );
    }

    #[test]
    fn required_claim_failure_names_the_claim() {
        let err = ResolveError::RequiredClaimFailed {
            name: "quota".to_string(),
            source: ClaimError::FunctionExecution("boom".to_string()),
        };
        assert!(err.to_string().contains("quota"));
    }
}
