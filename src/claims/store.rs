// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Descriptor store and configuration precedence.
//!
//! Descriptors live as YAML documents in a directory, one file per key
//! reference (`<reference>.yaml`) plus a default descriptor
//! (`base_api_key.yaml`). The store holds only the directory path; reads
//! are per-request and there is no mutation, so concurrent requests share
//! it freely.
//!
//! [`resolve_descriptor`] implements the three-source precedence as one
//! ordered short-circuit: inline payload, then file reference, then the
//! default descriptor. The file lookup only ever touches disk when no
//! inline payload was supplied.

use std::path::{Path, PathBuf};

use super::descriptor::ConfigDescriptor;
use super::error::ResolveError;

/// File name of the default descriptor.
pub const BASE_DESCRIPTOR_FILE: &str = "base_api_key.yaml";

/// What to do when a file reference does not resolve.
///
/// The engine hard-fails by default: a caller who names a key config and
/// gets the wrong one is worse off than one who gets an error. The token
/// route opts into fallback for plain `api_key` references to preserve the
/// service's historical fall-back-to-base behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReference {
    HardFail,
    FallBackToDefault,
}

/// Read-only directory of API key descriptors.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    dir: PathBuf,
}

impl DescriptorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the descriptor for a key reference.
    pub fn load(&self, reference: &str) -> Result<ConfigDescriptor, ResolveError> {
        // References are file stems, never paths.
        if reference.is_empty()
            || reference.contains(['/', '\\'])
            || reference.contains("..")
        {
            return Err(ResolveError::ConfigNotFound(reference.to_string()));
        }
        self.load_file(&self.dir.join(format!("{reference}.yaml")), reference)
    }

    /// Load the default descriptor (`base_api_key.yaml`).
    pub fn load_default(&self) -> Result<ConfigDescriptor, ResolveError> {
        self.load_file(&self.dir.join(BASE_DESCRIPTOR_FILE), "base_api_key")
    }

    fn load_file(&self, path: &Path, reference: &str) -> Result<ConfigDescriptor, ResolveError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|_| ResolveError::ConfigNotFound(reference.to_string()))?;
        let descriptor: ConfigDescriptor = serde_yaml::from_str(&raw).map_err(|e| {
            ResolveError::InvalidConfigSchema(format!("{reference}: {e}"))
        })?;
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Decide which descriptor is authoritative for a request.
///
/// Precedence, strictly in order:
/// 1. a non-empty inline payload, returned verbatim (no file I/O happens,
///    even if a reference was also supplied);
/// 2. a file reference, loaded from the store; a miss is `ConfigNotFound`
///    unless `missing` requests fallback to the default;
/// 3. the default descriptor.
pub fn resolve_descriptor(
    store: &DescriptorStore,
    inline: Option<ConfigDescriptor>,
    reference: Option<&str>,
    missing: MissingReference,
) -> Result<ConfigDescriptor, ResolveError> {
    if let Some(descriptor) = inline.filter(|d| !d.is_empty()) {
        descriptor.validate()?;
        return Ok(descriptor);
    }

    if let Some(reference) = reference {
        return match store.load(reference) {
            Err(ResolveError::ConfigNotFound(_))
                if missing == MissingReference::FallBackToDefault =>
            {
                tracing::info!(reference, "api key config not found, using default");
                store.load_default()
            }
            other => other,
        };
    }

    store.load_default()
}
