//! `tasklist-server`: in-memory reference implementation of the tasklist
//! REST API.
//!
//! Serves every endpoint the client uses, scoped per user and authorized by
//! bearer token. State lives in memory and is lost on restart.

pub mod config;
pub mod server;
pub mod store;
