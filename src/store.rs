use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

/// Errors a storage backend can report
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A writer panicked while holding the lock
    #[error("lock poisoned")]
    LockPoisoned,
    /// Failure inside a backend that talks to the outside world
    #[error("backend i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value storage capability used by the dispatcher.
///
/// Every operation may be called concurrently from independent tasks.
/// Values cross this boundary by copy in both directions: `put` never
/// retains the caller's buffer and `get` hands out an owned value.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the value stored under `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Fetch a copy of the value under `key`, `None` if it is absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`, returning whether it was present before the call
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// All keys present at one instant, in no particular order
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory key-value store
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held
    pub fn len(&self) -> Result<usize, StoreError> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        // Copy before taking the write guard so the critical section is just the insert.
        let owned = value.to_vec();
        let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
        data.insert(key.to_string(), owned);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.keys().cloned().collect())
    }
}
