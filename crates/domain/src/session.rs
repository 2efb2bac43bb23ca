//! Session state shared between the client and its token store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys under which session fields are persisted by a token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKey {
    /// Short-lived bearer token attached to every request.
    AccessToken,
    /// Long-lived token exchanged for new access tokens.
    RefreshToken,
    /// Serialized profile of the logged-in user.
    User,
}

impl SessionKey {
    /// All keys, in storage order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::AccessToken, Self::RefreshToken, Self::User]
    }

    /// The storage name for this key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A snapshot of the authenticated session.
///
/// All fields are optional: an anonymous session has none of them,
/// and a store may hold a partial session after a failed refresh
/// cleanup or manual edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent in the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Token used to obtain a fresh access token after a 401.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Profile object returned by the login endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

impl Session {
    /// A session with no stored credentials.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            user: None,
        }
    }

    /// Creates a fully populated session.
    #[must_use]
    pub fn authenticated(
        access_token: String,
        refresh_token: String,
        user: Value,
    ) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            user: Some(user),
        }
    }

    /// Returns true if an access token is present.
    ///
    /// Presence is the only criterion; an expired token still counts
    /// until the server rejects it.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}
