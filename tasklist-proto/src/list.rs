//! List wire types.

use serde::{Deserialize, Serialize};

use crate::id::ListId;

/// A named container of tasks, as returned by `GET /lists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    /// Server-assigned identifier.
    pub id: ListId,
    /// Display title (non-empty).
    pub title: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `POST /lists` and `PUT /lists/{id}`.
///
/// An absent `detail` is omitted from the JSON so that an update leaves the
/// server's stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBody {
    /// New title.
    pub title: String,
    /// New description, if it should be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ListBody {
    /// Attaches the server-assigned id, producing the cached list entry.
    #[must_use]
    pub fn into_list(self, id: ListId) -> List {
        List {
            id,
            title: self.title,
            detail: self.detail,
        }
    }
}
