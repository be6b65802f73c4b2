// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Placeholder substitution for dynamic claim specs.
//!
//! Replaces `{name}` tokens in strings with values from the
//! [`ResolutionContext`], recursing into sequences and mappings. A string
//! that consists of exactly one placeholder is replaced by the context value
//! verbatim, preserving its type (so `"{groups}"` yields the groups array,
//! not its string rendering). Placeholders embedded in longer strings are
//! replaced by their string rendering.
//!
//! An unresolved name is left in place as a literal marker and recorded in
//! [`Substituted::missing`]; the dispatcher turns the first such name into a
//! per-claim `FailedSubstitution` so sibling claims keep resolving.
//!
//! Substitution applies only to the `args`/`url`/`headers` sub-structures of
//! dynamic specs. Static claims and descriptor metadata are literal by
//! contract and never pass through here.

use serde_json::Value;

use super::context::ResolutionContext;

/// Result of substituting one value tree.
#[derive(Debug, Clone)]
pub struct Substituted {
    pub value: Value,
    /// Placeholder names with no value in the context, in encounter order.
    pub missing: Vec<String>,
}

impl Substituted {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Substitute placeholders throughout a value tree.
pub fn substitute_value(value: &Value, ctx: &ResolutionContext) -> Substituted {
    let mut missing = Vec::new();
    let value = walk(value, ctx, &mut missing);
    Substituted { value, missing }
}

/// Substitute placeholders in a single string, always producing a string.
///
/// Used for URLs and header values, where the result must be textual even
/// when a placeholder names a non-string context value.
pub fn substitute_str(input: &str, ctx: &ResolutionContext) -> (String, Vec<String>) {
    let mut missing = Vec::new();
    let out = replace_embedded(input, ctx, &mut missing);
    (out, missing)
}

fn walk(value: &Value, ctx: &ResolutionContext, missing: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) => substitute_string_value(s, ctx, missing),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| walk(v, ctx, missing)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), walk(v, ctx, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_string_value(s: &str, ctx: &ResolutionContext, missing: &mut Vec<String>) -> Value {
    // Exact-placeholder strings keep the context value's type.
    if let Some(name) = whole_placeholder(s) {
        return match ctx.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.push(name.to_string());
                Value::String(s.to_string())
            }
        };
    }
    Value::String(replace_embedded(s, ctx, missing))
}

/// `{name}` spanning the entire string, with a well-formed name.
fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    is_placeholder_name(inner).then_some(inner)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn replace_embedded(input: &str, ctx: &ResolutionContext, missing: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder_name(&after[..end]) => {
                let name = &after[..end];
                match ctx.get(name) {
                    Some(value) => out.push_str(&render(value)),
                    None => {
                        missing.push(name.to_string());
                        // Keep the unresolved token literal.
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                // Not a placeholder; emit the brace and continue.
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// String rendering of a context value for embedded substitution.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
