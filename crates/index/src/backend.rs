//! Pluggable key-value storage behind the blocking index.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::IndexError;

#[cfg(feature = "backend-redb")]
mod redb;
#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;

/// Storage abstraction the index writes through.
///
/// Implementations must be safe to share across threads. Keys are flat
/// strings; the index owns the key schema.
pub trait IndexBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;

    fn delete(&self, key: &str) -> Result<(), IndexError>;

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        for (key, value) in entries {
            self.put(&key, &value)?;
        }
        Ok(())
    }

    /// Visit every stored `(key, value)` pair. Iteration order is
    /// backend-defined.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;

    /// Persist buffered writes. In-memory backends treat this as a no-op.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Backend selection, resolved once when the index is built.
#[derive(Debug, Clone, Default)]
pub enum BackendConfig {
    /// Process-local map, dropped with the index.
    #[default]
    InMemory,
    /// Embedded redb database at the given path.
    #[cfg(feature = "backend-redb")]
    Redb { path: std::path::PathBuf },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    #[cfg(feature = "backend-redb")]
    pub fn redb(path: impl Into<std::path::PathBuf>) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            #[cfg(feature = "backend-redb")]
            BackendConfig::Redb { path } => Ok(Box::new(RedbBackend::open(path)?)),
        }
    }
}

/// Default backend: a `HashMap` behind an `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    map: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let mut map = self
            .map
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        map.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let map = self
            .map
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(map.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let mut map = self
            .map
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        map.remove(key);
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let mut map = self
            .map
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let map = self
            .map
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for (key, value) in map.iter() {
            visitor(key, value)?;
        }
        Ok(())
    }
}
