// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key configuration descriptors.
//!
//! A descriptor drives claims resolution for one request. It is parsed from
//! an inline JSON payload or a YAML file and is never mutated once built.
//!
//! ## Wire Format
//!
//! ```yaml
//! id: team-alpha-key
//! owner: Team Alpha
//! claims:
//!   static:
//!     tier: premium
//!     models: [gpt-4, gpt-3.5-turbo]
//!   dynamic:
//!     quota:
//!       type: function
//!       module: claims.quota
//!       function: get_remaining_quota
//!       args:
//!         user_id: "{user_id}"
//!     usage_stats:
//!       type: api
//!       url: "http://usage-service/api/stats/{api_key_id}"
//!       method: GET
//!       headers:
//!         Authorization: "Bearer {internal_token}"
//!       response_field: data
//!     limits:
//!       type: formula
//!       formulas:
//!         context_window: "tier == 'premium' ? 4096 : 2048"
//! metadata:
//!   description: visible to resolvers, never emitted as a claim
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::ResolveError;

/// A resolved API key configuration document.
///
/// `metadata` is auxiliary lookup data for claim resolvers; it never appears
/// in the final claim mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfigDescriptor {
    /// Identifier for this key configuration (becomes the `api_key_id` claim).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable owner of the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Static and dynamic claim configuration.
    #[serde(default)]
    pub claims: ClaimsConfig,

    /// Free-form auxiliary data, visible to resolvers only.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

impl ConfigDescriptor {
    /// A descriptor with no id, owner, claims, or metadata.
    ///
    /// An inline payload that deserializes to this carries no information
    /// and does not take precedence over a file reference.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.owner.is_none()
            && self.claims.static_claims.is_empty()
            && self.claims.dynamic.is_empty()
            && self.metadata.is_empty()
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for (name, spec) in &self.claims.dynamic {
            match spec {
                ClaimSpec::Function {
                    module, function, ..
                } => {
                    if module.is_empty() || function.is_empty() {
                        return Err(ResolveError::InvalidConfigSchema(format!(
                            "dynamic claim '{name}' is missing module or function"
                        )));
                    }
                }
                ClaimSpec::Api { url, .. } => {
                    if url.is_empty() {
                        return Err(ResolveError::InvalidConfigSchema(format!(
                            "dynamic claim '{name}' has an empty url"
                        )));
                    }
                }
                ClaimSpec::Formula { formulas, .. } => {
                    if formulas.is_empty() {
                        return Err(ResolveError::InvalidConfigSchema(format!(
                            "dynamic claim '{name}' declares no formulas"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The `claims` block of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClaimsConfig {
    /// Literal claims, copied into the output unchanged.
    #[serde(default, rename = "static")]
    #[schema(value_type = Object)]
    pub static_claims: Map<String, Value>,

    /// Claims computed at resolution time, in declaration order.
    ///
    /// Order matters: formulas may reference claims resolved earlier in the
    /// same pass.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub dynamic: IndexMap<String, ClaimSpec>,
}

/// Specification of one dynamic claim, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClaimSpec {
    /// Call a registered handler from the build-time function registry.
    Function {
        /// Logical module path, e.g. `claims.quota`.
        module: String,
        /// Handler name within the module.
        function: String,
        /// Arguments; string values may contain `{placeholder}` tokens.
        #[serde(default)]
        #[schema(value_type = Object)]
        args: Map<String, Value>,
        /// Escalate failure of this claim to a request-level error.
        #[serde(default)]
        required: bool,
    },

    /// Fetch the value from an external HTTP endpoint.
    Api {
        /// Target URL; may contain `{placeholder}` tokens.
        url: String,
        /// HTTP method, defaults to GET.
        #[serde(default)]
        method: HttpMethod,
        /// Request headers; values may contain `{placeholder}` tokens.
        #[serde(default)]
        #[schema(value_type = Object)]
        headers: IndexMap<String, String>,
        /// Dot-path selecting a nested field from the response body.
        /// When absent the whole decoded body becomes the claim value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_field: Option<String>,
        /// Escalate failure of this claim to a request-level error.
        #[serde(default)]
        required: bool,
    },

    /// Evaluate one or more formula expressions. Each entry produces its own
    /// output claim named by the sub-key.
    Formula {
        /// Sub-claim name to expression, in declaration order.
        #[serde(default)]
        #[schema(value_type = Object)]
        formulas: IndexMap<String, String>,
        /// Escalate failure of any sub-claim to a request-level error.
        #[serde(default)]
        required: bool,
    },
}

impl ClaimSpec {
    /// Wire name of this claim kind, for audit logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimSpec::Function { .. } => "function",
            ClaimSpec::Api { .. } => "api",
            ClaimSpec::Formula { .. } => "formula",
        }
    }

    pub fn required(&self) -> bool {
        match self {
            ClaimSpec::Function { required, .. }
            | ClaimSpec::Api { required, .. }
            | ClaimSpec::Formula { required, .. } => *required,
        }
    }
}

/// HTTP methods accepted for `api` claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}
