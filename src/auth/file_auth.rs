// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed user directory.
//!
//! Users live in a YAML file keyed by username:
//!
//! ```yaml
//! alice:
//!   password: 5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8
//!   name: Alice Example
//!   email: alice@example.com
//!   groups: [ai-team]
//!   roles: [user]
//! ```
//!
//! Passwords are stored as lowercase hex SHA-256 digests. The file is
//! re-read on every login so edits take effect without a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::error::AuthError;
use super::Identity;

#[derive(Debug, Deserialize)]
struct UserRecord {
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Authenticates usernames and passwords against a YAML user file.
#[derive(Debug, Clone)]
pub struct FileAuthenticator {
    users_file: PathBuf,
}

impl FileAuthenticator {
    pub fn new(users_file: impl AsRef<Path>) -> Self {
        Self {
            users_file: users_file.as_ref().to_path_buf(),
        }
    }

    /// Verify a username/password pair and return the user's identity.
    ///
    /// Unknown users and wrong passwords both map to
    /// [`AuthError::InvalidCredentials`] so login failures do not leak
    /// which usernames exist.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let raw = std::fs::read_to_string(&self.users_file).map_err(|e| {
            AuthError::Backend(format!(
                "failed to read users file {}: {e}",
                self.users_file.display()
            ))
        })?;
        let users: HashMap<String, UserRecord> = serde_yaml::from_str(&raw)
            .map_err(|e| AuthError::Backend(format!("invalid users file: {e}")))?;

        let record = users.get(username).ok_or(AuthError::InvalidCredentials)?;

        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        if !digest.eq_ignore_ascii_case(&record.password) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            username: username.to_string(),
            name: record.name.clone(),
            email: record.email.clone(),
            groups: record.groups.clone(),
            roles: record.roles.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    // SHA-256("password")
    const PASSWORD_DIGEST: &str =
        "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

    fn users_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "alice:\n  password: {PASSWORD_DIGEST}\n  name: Alice Example\n  email: alice@example.com\n  groups: [ai-team]\n  roles: [user]\n"
        )
        .unwrap();
        file
    }

    #[test]
    fn valid_credentials_return_identity() {
        let file = users_file();
        let auth = FileAuthenticator::new(file.path());

        let identity = auth.authenticate("alice", "password").unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.groups, vec!["ai-team".to_string()]);
        assert_eq!(identity.team_id(), "ai-team");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let file = users_file();
        let auth = FileAuthenticator::new(file.path());

        let err = auth.authenticate("alice", "hunter2").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let file = users_file();
        let auth = FileAuthenticator::new(file.path());

        let err = auth.authenticate("mallory", "password").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn missing_users_file_is_a_backend_error() {
        let auth = FileAuthenticator::new("/nonexistent/users.yaml");
        let err = auth.authenticate("alice", "password").unwrap_err();
        assert!(matches!(err, AuthError::Backend(_)));
    }
}
