// caching/src/sled_store.rs
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use models::errors::{RecordError, RecordResult};

use crate::LocalStore;

const TREE_NAME: &str = "local_storage";

fn sled_err(e: sled::Error) -> RecordError {
    RecordError::StorageError(format!("Sled error: {}", e))
}

/// Persistent local store backed by a sled tree.
#[derive(Clone, Debug)]
pub struct SledLocalStore {
    tree: sled::Tree,
}

impl SledLocalStore {
    pub fn open(path: &Path) -> RecordResult<Self> {
        let db = sled::Config::new().path(path).open().map_err(sled_err)?;
        info!("Opened local cache at {:?}", path);
        Self::from_db(&db)
    }

    /// Throwaway database removed when dropped.
    pub fn temporary() -> RecordResult<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(sled_err)?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> RecordResult<Self> {
        let tree = db.open_tree(TREE_NAME).map_err(sled_err)?;
        Ok(SledLocalStore { tree })
    }
}

#[async_trait]
impl LocalStore for SledLocalStore {
    async fn get(&self, key: &str) -> RecordResult<Option<Vec<u8>>> {
        let value = self.tree.get(key.as_bytes()).map_err(sled_err)?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> RecordResult<()> {
        self.tree.insert(key.as_bytes(), value).map_err(sled_err)?;
        self.tree.flush_async().await.map_err(sled_err)?;
        debug!("Wrote local entry {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> RecordResult<()> {
        self.tree.remove(key.as_bytes()).map_err(sled_err)?;
        self.tree.flush_async().await.map_err(sled_err)?;
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "sled"
    }
}
