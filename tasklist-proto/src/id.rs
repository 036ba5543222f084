//! Server-assigned identifiers.
//!
//! Identifiers are opaque strings minted by the server on creation. The
//! client never parses or generates them; it only compares and echoes them
//! back in request paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(String);

/// Identifier of a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

macro_rules! opaque_id {
    ($name:ident) => {
        impl $name {
            /// Wraps a server-issued identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as it appears on the wire.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(ListId);
opaque_id!(TaskId);

/// Response body of a create call: `{"id": ...}`.
///
/// The server may echo further fields; only the id is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created<I> {
    /// Identifier assigned by the server.
    pub id: I,
}
