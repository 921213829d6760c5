// lib/src/storage_engine/inmemory_storage.rs
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use models::errors::{RecordError, RecordResult};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

use crate::storage_engine::{DocumentStorage, ObjectEntry, ObjectStorage, UploadOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// Object storage held in process memory. Also used as the test double for
/// the hosted service, hence the failure switches.
#[derive(Debug)]
pub struct InMemoryObjectStorage {
    bucket: String,
    objects: TokioMutex<BTreeMap<String, StoredObject>>,
    failing_keys: TokioMutex<HashSet<String>>,
    offline: AtomicBool,
}

impl InMemoryObjectStorage {
    pub fn new(bucket: &str) -> Self {
        InMemoryObjectStorage {
            bucket: bucket.to_string(),
            objects: TokioMutex::new(BTreeMap::new()),
            failing_keys: TokioMutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Makes every call fail with `StorageError` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes downloads of `key` fail with `StorageError`.
    pub async fn fail_downloads_of(&self, key: &str) {
        self.failing_keys.lock().await.insert(key.to_string());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    fn check_online(&self) -> RecordResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RecordError::StorageError("object storage is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn list(&self, prefix: &str) -> RecordResult<Vec<ObjectEntry>> {
        self.check_online()?;
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let objects = self.objects.lock().await;
        Ok(objects
            .range(dir.clone()..)
            .take_while(|(key, _)| key.starts_with(&dir))
            .filter_map(|(key, object)| {
                let name = &key[dir.len()..];
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                Some(ObjectEntry {
                    name: name.to_string(),
                    created_at: Some(object.created_at),
                    content_type: Some(object.content_type.clone()),
                    size: Some(object.bytes.len() as u64),
                })
            })
            .collect())
    }

    async fn download(&self, key: &str) -> RecordResult<Vec<u8>> {
        self.check_online()?;
        if self.failing_keys.lock().await.contains(key) {
            return Err(RecordError::StorageError(format!("download of {} failed", key)));
        }
        self.objects
            .lock()
            .await
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| RecordError::NotFound(key.to_string()))
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, options: UploadOptions) -> RecordResult<()> {
        self.check_online()?;
        let mut objects = self.objects.lock().await;
        if !options.upsert && objects.contains_key(key) {
            return Err(RecordError::StorageError(format!("object {} already exists", key)));
        }
        debug!("Storing {} ({} bytes) in bucket {}", key, bytes.len(), self.bucket);
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: options.content_type,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> RecordResult<()> {
        self.check_online()?;
        let mut objects = self.objects.lock().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }

    fn get_type(&self) -> &'static str {
        "in-memory"
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStorage {
    tables: TokioMutex<HashMap<String, HashMap<String, Value>>>,
    offline: AtomicBool,
}

impl InMemoryDocumentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> RecordResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RecordError::StorageError("document database is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStorage for InMemoryDocumentStorage {
    async fn get(&self, table: &str, id: &str) -> RecordResult<Option<Value>> {
        self.check_online()?;
        Ok(self
            .tables
            .lock()
            .await
            .get(table)
            .and_then(|rows| rows.get(id))
            .cloned())
    }

    async fn put(&self, table: &str, id: &str, document: Value) -> RecordResult<()> {
        self.check_online()?;
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> RecordResult<()> {
        self.check_online()?;
        if let Some(rows) = self.tables.lock().await.get_mut(table) {
            rows.remove(id);
        }
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "in-memory"
    }
}
