use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use bytes::Bytes;
use tracing::{debug, error};

use crate::protocol::command::Command;
use crate::protocol::reply::Reply;
use crate::store::Store;

/// Routes parsed commands onto a Store.
///
/// Holds no state of its own besides the shared store handle, so one
/// instance serves every in-flight request.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn Store>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Parse and execute one request.
    ///
    /// `payload` is only awaited for PUT, and it is fully read before the
    /// store is touched. A payload error leaves the store unchanged.
    pub async fn dispatch<F, E>(&self, method: &Method, path: &str, payload: F) -> Reply
    where
        F: Future<Output = Result<Bytes, E>>,
        E: Display,
    {
        let cmd = Command::parse(method, path);
        debug!("Dispatching {} {} as {}", method, path, cmd.name());

        match cmd {
            Command::List => self.list().await,
            Command::Get(key) => self.get(&key).await,
            Command::Put(key) => match payload.await {
                Ok(body) => self.put(&key, &body).await,
                Err(e) => {
                    error!("server error: failed to read request body for '{}': {}", key, e);
                    Reply::ServerError
                }
            },
            Command::Delete(key) => self.delete(&key).await,
            Command::Unknown => Reply::not_found(),
        }
    }

    async fn list(&self) -> Reply {
        match self.store.keys().await {
            Ok(keys) => Reply::Keys(keys),
            Err(e) => {
                error!("server error: error fetching keys: {}", e);
                Reply::ServerError
            }
        }
    }

    async fn get(&self, key: &str) -> Reply {
        match self.store.get(key).await {
            Ok(Some(value)) => Reply::Value(value),
            Ok(None) => Reply::no_such_key(key),
            Err(e) => {
                error!("server error: error getting key '{}': {}", key, e);
                Reply::ServerError
            }
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Reply {
        match self.store.put(key, value).await {
            Ok(()) => Reply::Ok,
            Err(e) => {
                error!("server error: failed to store key '{}': {}", key, e);
                Reply::ServerError
            }
        }
    }

    async fn delete(&self, key: &str) -> Reply {
        match self.store.delete(key).await {
            Ok(true) => Reply::Ok,
            Ok(false) => Reply::no_such_key(key),
            Err(e) => {
                error!("server error: error deleting key '{}': {}", key, e);
                Reply::ServerError
            }
        }
    }
}
