//! Account and session wire types.

use serde::{Deserialize, Serialize};

/// Body of `POST /signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account e-mail.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Account e-mail.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Response of `POST /signin` and `POST /users`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBody {
    /// Bearer token for subsequent requests.
    pub token: String,
}

impl std::fmt::Debug for TokenBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBody").field("token", &"<redacted>").finish()
    }
}

/// Response of `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    pub name: String,
}
