use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::IndexBackend;
use crate::IndexError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("neardup_index");

/// Embedded redb backend. One database file, one table; every commit is
/// durable, so `flush` has nothing left to do.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(|e| IndexError::backend(e.to_string()))?;
        // Create the table up front so readers never race an empty database.
        let txn = db
            .begin_write()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        {
            txn.open_table(TABLE)
                .map_err(|e| IndexError::backend(e.to_string()))?;
        }
        txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
        Ok(Self { db })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| IndexError::backend(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| IndexError::backend(e.to_string()))?;
        }
        txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        let table = txn
            .open_table(TABLE)
            .map_err(|e| IndexError::backend(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| IndexError::backend(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| IndexError::backend(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| IndexError::backend(e.to_string()))?;
        }
        txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        {
            let mut table = txn
                .open_table(TABLE)
                .map_err(|e| IndexError::backend(e.to_string()))?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| IndexError::backend(e.to_string()))?;
            }
        }
        txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        let table = txn
            .open_table(TABLE)
            .map_err(|e| IndexError::backend(e.to_string()))?;
        let iter = table
            .iter()
            .map_err(|e| IndexError::backend(e.to_string()))?;
        for item in iter {
            let (key, value) = item.map_err(|e| IndexError::backend(e.to_string()))?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}
