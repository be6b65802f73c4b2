// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::FileAuthenticator;
use crate::claims::ClaimsEngine;
use crate::token::TokenSigner;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ClaimsEngine>,
    pub authenticator: Arc<FileAuthenticator>,
    pub signer: Arc<TokenSigner>,
    /// Token injected into claim resolution as `{internal_token}` so
    /// descriptors can call internal APIs without storing secrets.
    pub internal_token: String,
}

impl AppState {
    pub fn new(
        engine: ClaimsEngine,
        authenticator: FileAuthenticator,
        signer: TokenSigner,
        internal_token: String,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            authenticator: Arc::new(authenticator),
            signer: Arc::new(signer),
            internal_token,
        }
    }

    /// Build a state backed by temporary files, for handler tests.
    ///
    /// The returned `TempDir` holds both the descriptor directory and
    /// the users file and must outlive the state.
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use sha2::{Digest, Sha256};

        use crate::claims::{DescriptorStore, FunctionRegistry};

        let dir = tempfile::tempdir().unwrap();

        let keys_dir = dir.path().join("api_keys");
        std::fs::create_dir(&keys_dir).unwrap();
        std::fs::write(
            keys_dir.join("base_api_key.yaml"),
            "id: base_api_key\nowner: platform\nclaims:\n  static:\n    tier: basic\n",
        )
        .unwrap();

        let users_file = dir.path().join("users.yaml");
        let digest = hex::encode(Sha256::digest(b"password"));
        std::fs::write(
            &users_file,
            format!(
                "alice:\n  password: {digest}\n  name: Alice Example\n  email: alice@example.com\n  groups: [ai-team]\n  roles: [user]\n"
            ),
        )
        .unwrap();

        let engine = ClaimsEngine::new(
            DescriptorStore::new(&keys_dir),
            Arc::new(FunctionRegistry::builtin()),
        );
        let state = Self::new(
            engine,
            FileAuthenticator::new(&users_file),
            TokenSigner::new("test-secret-key"),
            "test-internal-token".to_string(),
        );
        (state, dir)
    }
}
