//! Authentication state shared by the HTTP client and the stores.
//!
//! A [`Session`] is a cheap, cloneable handle to the current bearer token.
//! The HTTP client reads it to authorize requests; the stores read it to
//! decide whether a fetch should be attempted at all. Neither refreshes it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared handle to the current session token.
///
/// Clones observe the same token: signing in through one handle is visible
/// to every other holder.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// Creates an unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    /// Returns a copy of the current token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Replaces the current token. An empty token clears the session.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write() = if token.is_empty() { None } else { Some(token) };
    }

    /// Drops the current token.
    pub fn clear(&self) {
        self.token.write().take();
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
