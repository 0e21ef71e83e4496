//! Caller identity and per-field authorization modes.

use serde::{Deserialize, Serialize};

/// The identity of a caller, when authenticated.
///
/// A user identity comes from the external identity provider; a service
/// identity is minted in-process for internal callers such as the
/// change-stream bridge. Either way the `sub` is what gets persisted as
/// a story's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier.
    pub sub: String,
    /// Display name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Group memberships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl Identity {
    /// Creates a user identity with the given subject.
    #[must_use]
    pub fn user(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            username: None,
            groups: Vec::new(),
        }
    }

    /// Creates an internal service identity.
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            sub: format!("service:{name}"),
            username: Some(name),
            groups: vec!["service".to_string()],
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// Authorization mode for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// The caller must present an identity.
    Required,
    /// Anonymous callers are allowed.
    AllowAnonymous,
}

impl AuthMode {
    /// Whether an invocation with the given identity passes this mode.
    #[must_use]
    pub fn permits(self, identity: Option<&Identity>) -> bool {
        match self {
            Self::Required => identity.is_some(),
            Self::AllowAnonymous => true,
        }
    }
}
