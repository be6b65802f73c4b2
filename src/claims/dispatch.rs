// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dynamic claim dispatch.
//!
//! Resolves every dynamic claim spec of a descriptor, strictly in
//! declaration order: formulas may read claims resolved earlier in the same
//! pass, so ordering is part of the contract. Each claim's failure is caught
//! here, logged with its name, kind, and cause, and carried as a per-claim
//! error; one claim's failure never aborts its siblings.
//!
//! `api` claims make a single bounded-timeout HTTP attempt. No retries.

use std::time::Duration;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use super::context::ResolutionContext;
use super::descriptor::{ClaimSpec, HttpMethod};
use super::error::ClaimError;
use super::placeholder::{substitute_str, substitute_value};
use super::registry::FunctionRegistry;

/// Timeout for one outbound claim lookup.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of resolving one output claim, in declaration order.
#[derive(Debug)]
pub struct ClaimOutcome {
    /// Output claim name (the spec name, or a formula sub-key).
    pub name: String,
    /// Wire kind of the producing spec, for audit logs.
    pub kind: &'static str,
    /// Whether failure escalates to a request-level error.
    pub required: bool,
    pub result: Result<Value, ClaimError>,
}

/// Resolves dynamic claim specs against the request context.
pub struct ClaimsDispatcher<'a> {
    registry: &'a FunctionRegistry,
    http: &'a reqwest::Client,
    call_timeout: Duration,
}

impl<'a> ClaimsDispatcher<'a> {
    pub fn new(registry: &'a FunctionRegistry, http: &'a reqwest::Client) -> Self {
        Self {
            registry,
            http,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Resolve all dynamic claims sequentially.
    ///
    /// `static_claims` and the context seed the formula scope; claims
    /// resolved earlier in this pass are added to it as they succeed.
    /// `metadata` is handed to function handlers as auxiliary lookup data.
    pub async fn resolve_all(
        &self,
        dynamic: &IndexMap<String, ClaimSpec>,
        static_claims: &Map<String, Value>,
        ctx: &ResolutionContext,
        metadata: &Map<String, Value>,
    ) -> Vec<ClaimOutcome> {
        let mut outcomes = Vec::new();
        // Successful dynamic values so far, visible to later formulas.
        let mut resolved: Map<String, Value> = Map::new();

        for (name, spec) in dynamic {
            match spec {
                ClaimSpec::Function {
                    module,
                    function,
                    args,
                    required,
                } => {
                    let result = self.resolve_function(module, function, args, ctx, metadata);
                    self.record(&mut outcomes, &mut resolved, name, spec.kind(), *required, result);
                }
                ClaimSpec::Api {
                    url,
                    method,
                    headers,
                    response_field,
                    required,
                } => {
                    let result = self
                        .resolve_api(url, *method, headers, response_field.as_deref(), ctx)
                        .await;
                    self.record(&mut outcomes, &mut resolved, name, spec.kind(), *required, result);
                }
                ClaimSpec::Formula { formulas, required } => {
                    for (sub_name, expression) in formulas {
                        let mut scope = static_claims.clone();
                        scope.extend(ctx.values().clone());
                        scope.extend(resolved.clone());

                        let result = super::formula::evaluate(expression, &scope)
                            .map_err(ClaimError::from);
                        self.record(
                            &mut outcomes,
                            &mut resolved,
                            sub_name,
                            spec.kind(),
                            *required,
                            result,
                        );
                    }
                }
            }
        }

        outcomes
    }

    fn record(
        &self,
        outcomes: &mut Vec<ClaimOutcome>,
        resolved: &mut Map<String, Value>,
        name: &str,
        kind: &'static str,
        required: bool,
        result: Result<Value, ClaimError>,
    ) {
        match &result {
            Ok(value) => {
                resolved.insert(name.to_string(), value.clone());
            }
            Err(error) => {
                warn!(claim = name, kind, error_kind = error.kind(), %error, "dynamic claim failed");
            }
        }
        outcomes.push(ClaimOutcome {
            name: name.to_string(),
            kind,
            required,
            result,
        });
    }

    fn resolve_function(
        &self,
        module: &str,
        function: &str,
        args: &Map<String, Value>,
        ctx: &ResolutionContext,
        metadata: &Map<String, Value>,
    ) -> Result<Value, ClaimError> {
        let substituted = substitute_value(&Value::Object(args.clone()), ctx);
        if let Some(missing) = substituted.missing.first() {
            return Err(ClaimError::FailedSubstitution(missing.clone()));
        }
        let Value::Object(args) = substituted.value else {
            // substitute_value preserves the mapping shape
            unreachable!("object substitution produced a non-object");
        };

        let handler = self
            .registry
            .get(module, function)
            .ok_or_else(|| ClaimError::UnknownFunction {
                module: module.to_string(),
                function: function.to_string(),
            })?;

        handler
            .call(&args, metadata)
            .map_err(|e| ClaimError::FunctionExecution(e.to_string()))
    }

    async fn resolve_api(
        &self,
        url: &str,
        method: HttpMethod,
        headers: &IndexMap<String, String>,
        response_field: Option<&str>,
        ctx: &ResolutionContext,
    ) -> Result<Value, ClaimError> {
        let (url, missing) = substitute_str(url, ctx);
        if let Some(missing) = missing.first() {
            return Err(ClaimError::FailedSubstitution(missing.clone()));
        }

        let mut request = self
            .http
            .request(method.into(), &url)
            .timeout(self.call_timeout);
        for (header_name, header_value) in headers {
            let (value, missing) = substitute_str(header_value, ctx);
            if let Some(missing) = missing.first() {
                return Err(ClaimError::FailedSubstitution(missing.clone()));
            }
            request = request.header(header_name.as_str(), value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClaimError::ExternalCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClaimError::ExternalCall(format!("HTTP {status} from {url}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClaimError::ExternalCall(format!("invalid JSON response: {e}")))?;

        match response_field {
            Some(path) => extract_field(&body, path)
                .cloned()
                .ok_or_else(|| ClaimError::ResponseFieldNotFound(path.to_string())),
            None => Ok(body),
        }
    }
}

/// Select a nested field by dot-path, e.g. `data.user.quota`.
fn extract_field<'v>(body: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(body, |value, part| value.get(part))
}
