//! `tasklist`: client library for a todo-list REST service.
//!
//! The [`api`] module talks to the server, [`store`] keeps the client-side
//! caches of lists and tasks, and [`client::TodoClient`] ties both to a
//! [`session::Session`].

pub mod api;
pub mod client;
pub mod config;
pub mod due;
pub mod session;
pub mod store;
