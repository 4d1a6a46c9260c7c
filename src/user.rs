//! The user profile the backend returns after logging in.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};

/// A newtype wrapper for user IDs.
///
/// The backend may send the ID as a number or a string. Either way it is
/// kept as the text the backend sent, since the client never does
/// arithmetic on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Hash)]
pub struct UserID(String);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for UserID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(id) => UserID(id.to_string()),
            RawId::Text(id) => UserID(id),
        })
    }
}

/// A user of the application.
///
/// The client holds a read-only copy for as long as the session lasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the backend.
    pub id: UserID,
    /// The user's display name.
    pub username: String,
    /// The email address the user logs in with.
    pub email: String,
}
