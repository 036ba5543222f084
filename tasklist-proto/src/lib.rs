//! Wire types for the tasklist REST API.
//!
//! Every request and response body the client and the reference server
//! exchange lives here, together with the JSON codec and the due-date
//! (`limit`) wire format.

pub mod auth;
pub mod codec;
pub mod error;
pub mod id;
pub mod limit;
pub mod list;
pub mod task;

pub use error::ApiErrorBody;
pub use id::{Created, ListId, TaskId};
pub use list::{List, ListBody};
pub use task::{Task, TaskBody, TaskPatch, TasksEnvelope};
