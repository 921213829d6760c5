// lib/src/storage_engine/storage_engine.rs
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use models::errors::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{StorageEngineType, StorageSettings};
use crate::storage_engine::http_storage::{HttpDocumentStorage, HttpObjectStorage};
use crate::storage_engine::inmemory_storage::{InMemoryDocumentStorage, InMemoryObjectStorage};

/// One object returned by a prefix listing. `name` is relative to the prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Overwrite an existing object instead of failing.
    pub upsert: bool,
    pub cache_control: Option<String>,
}

impl UploadOptions {
    pub fn json() -> Self {
        UploadOptions {
            content_type: "application/json".to_string(),
            upsert: true,
            cache_control: None,
        }
    }

    pub fn asset(content_type: impl Into<String>) -> Self {
        UploadOptions {
            content_type: content_type.into(),
            upsert: false,
            cache_control: Some("3600".to_string()),
        }
    }
}

/// Hierarchical object storage: prefix listing, download, upload and public
/// URL resolution. Every call is a single attempt.
#[async_trait]
pub trait ObjectStorage: Send + Sync + Debug + 'static {
    /// Objects directly under `prefix`, sorted by name. Sub-directories are
    /// not returned.
    async fn list(&self, prefix: &str) -> RecordResult<Vec<ObjectEntry>>;
    async fn download(&self, key: &str) -> RecordResult<Vec<u8>>;
    async fn upload(&self, key: &str, bytes: Vec<u8>, options: UploadOptions) -> RecordResult<()>;
    async fn remove(&self, keys: &[String]) -> RecordResult<()>;
    fn public_url(&self, key: &str) -> String;
    fn get_type(&self) -> &'static str;
}

/// Document database keyed by identity within a table.
#[async_trait]
pub trait DocumentStorage: Send + Sync + Debug + 'static {
    async fn get(&self, table: &str, id: &str) -> RecordResult<Option<Value>>;
    async fn put(&self, table: &str, id: &str, document: Value) -> RecordResult<()>;
    async fn delete(&self, table: &str, id: &str) -> RecordResult<()>;
    fn get_type(&self) -> &'static str;
}

pub fn build_object_storage(settings: &StorageSettings) -> RecordResult<Arc<dyn ObjectStorage>> {
    info!("Creating {} object storage for bucket '{}'", settings.engine, settings.bucket);
    match settings.engine {
        StorageEngineType::InMemory => Ok(Arc::new(InMemoryObjectStorage::new(&settings.bucket))),
        StorageEngineType::Http => Ok(Arc::new(HttpObjectStorage::new(settings)?)),
    }
}

pub fn build_document_storage(settings: &StorageSettings) -> RecordResult<Arc<dyn DocumentStorage>> {
    match settings.engine {
        StorageEngineType::InMemory => Ok(Arc::new(InMemoryDocumentStorage::new())),
        StorageEngineType::Http => Ok(Arc::new(HttpDocumentStorage::new(settings)?)),
    }
}

pub(crate) fn require_url(settings: &StorageSettings) -> RecordResult<&str> {
    if settings.url.trim().is_empty() {
        return Err(RecordError::ConfigurationError(
            "storage.url must be set for the http engine".to_string(),
        ));
    }
    Ok(settings.url.trim_end_matches('/'))
}
