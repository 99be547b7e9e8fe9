// The ledger only ever needs point reads, point writes, an existence check and
// one atomic multi-key write. Everything it persists goes through `KvStore`.

use crate::error::{LedgerError, Result};
use log::info;
use sled::{Db, Tree};
use std::path::Path;

/// Tree name for storing all blocks and the tip pointer
pub const BLOCKS_TREE: &str = "blocks";

/// Minimal key-value surface the ledger is built on
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Writes every entry or none of them.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Sled-backed store, one database directory per chain
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SledStore> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to open database: {e}")))?;
        let blocks = db.open_tree(BLOCKS_TREE).map_err(|e| {
            LedgerError::StorageUnavailable(format!("Failed to open blocks tree: {e}"))
        })?;
        info!("sled store opened at {}", path.display());
        Ok(SledStore { db, blocks })
    }

    /// Whether a database directory is present, without creating one
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .blocks
            .get(key)
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to read key: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.blocks
            .insert(key, value)
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to write key: {e}")))?;
        self.flush()
    }

    fn contains(&self, key: &[u8]) -> Result<bool> {
        self.blocks
            .contains_key(key)
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to check key: {e}")))
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<()> {
        self.blocks
            .transaction(|tx_db| {
                for (key, value) in entries {
                    tx_db.insert(*key, *value)?;
                }
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                LedgerError::StorageUnavailable(format!("Failed to apply batch: {e}"))
            })?;
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to flush: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_contains() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();

        assert!(!store.contains(b"l").unwrap());
        store.put(b"l", b"tip").unwrap();
        assert!(store.contains(b"l").unwrap());
        assert_eq!(store.get(b"l").unwrap(), Some(b"tip".to_vec()));
        assert_eq!(store.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_put_batch_writes_all_entries() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();

        store
            .put_batch(&[
                (b"hash".as_slice(), b"block".as_slice()),
                (b"l".as_slice(), b"hash".as_slice()),
            ])
            .unwrap();
        assert_eq!(store.get(b"hash").unwrap(), Some(b"block".to_vec()));
        assert_eq!(store.get(b"l").unwrap(), Some(b"hash".to_vec()));
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let store = SledStore::open(&path).unwrap();
            store.put(b"k", b"v").unwrap();
        }
        assert!(SledStore::exists(&path));
        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_exists_does_not_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never_opened");
        assert!(!SledStore::exists(&path));
        assert!(!path.exists());
    }
}
