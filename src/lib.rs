//! KvServe: an in-memory key-value store served over HTTP
//!
//! Clients store, fetch, delete and list opaque byte values under string
//! keys. `PUT /<key>` stores the request body, `GET /<key>` returns it,
//! `DELETE /<key>` removes it and `GET /` lists every key as JSON.

pub mod cli;
pub mod config;
pub mod protocol;
pub mod server;
pub mod store;

pub use config::Config;
pub use protocol::{Command, Dispatcher, Reply};
pub use server::Server;
pub use store::{MemoryStore, Store, StoreError};
