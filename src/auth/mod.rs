// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Password authentication against a YAML user directory, plus the
//! bearer-token extractor used by protected routes.
//!
//! ## Auth Flow
//!
//! 1. Client sends username and password to `POST /token`
//! 2. Server:
//!    - Loads the user record from the users file
//!    - Compares the SHA-256 digest of the submitted password
//!    - Derives the user's team from their group memberships
//! 3. Follow-up requests carry `Authorization: Bearer <access token>`
//!    and are verified by the [`extractor::Auth`] extractor.

pub mod error;
pub mod extractor;
pub mod file_auth;

pub use error::AuthError;
pub use extractor::Auth;
pub use file_auth::FileAuthenticator;

/// An authenticated user as loaded from the user directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub username: String,
    pub name: String,
    pub email: String,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
}

impl Identity {
    /// Derive the team identifier from group memberships.
    ///
    /// The first matching group wins; users outside every known group
    /// land in `general-users`.
    pub fn team_id(&self) -> &'static str {
        for group in &self.groups {
            match group.as_str() {
                "administrators" | "admins" => return "admin-team",
                "ai-team" => return "ai-team",
                "ml-team" => return "ml-team",
                _ => {}
            }
        }
        "general-users"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(groups: &[&str]) -> Identity {
        Identity {
            username: "alice".into(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            roles: vec!["user".into()],
        }
    }

    #[test]
    fn admin_groups_map_to_admin_team() {
        assert_eq!(identity(&["administrators"]).team_id(), "admin-team");
        assert_eq!(identity(&["admins"]).team_id(), "admin-team");
    }

    #[test]
    fn first_matching_group_wins() {
        assert_eq!(identity(&["ml-team", "admins"]).team_id(), "ml-team");
        assert_eq!(identity(&["sales", "ai-team"]).team_id(), "ai-team");
    }

    #[test]
    fn unknown_groups_fall_back_to_general_users() {
        assert_eq!(identity(&["sales"]).team_id(), "general-users");
        assert_eq!(identity(&[]).team_id(), "general-users");
    }
}
