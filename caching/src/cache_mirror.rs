// caching/src/cache_mirror.rs
use std::sync::Arc;

use log::{debug, warn};
use models::errors::RecordResult;
use models::{PatientRecord, SessionContext};

use crate::LocalStore;

pub const CACHE_KEY_PREFIX: &str = "patientData_";
pub const SESSION_KEY: &str = "session";

pub fn cache_key(id: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, id)
}

/// Best-effort mirror of patient records in device-local storage.
///
/// Reads never fail: a missing, unreadable or corrupt entry is a miss.
#[derive(Clone)]
pub struct CacheMirror {
    store: Arc<dyn LocalStore>,
}

impl CacheMirror {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        CacheMirror { store }
    }

    pub async fn read_cache(&self, id: &str) -> Option<PatientRecord> {
        let key = cache_key(id);
        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Local cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match PatientRecord::from_json(&key, &bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn write_cache(&self, id: &str, record: &PatientRecord) -> RecordResult<()> {
        let key = cache_key(id);
        self.store.put(&key, record.to_json()?).await?;
        debug!("Cached record {} in {} store", id, self.store.get_type());
        Ok(())
    }

    pub async fn evict(&self, id: &str) -> RecordResult<()> {
        self.store.remove(&cache_key(id)).await
    }

    /// Session flags saved by the last run; anonymous when absent.
    pub async fn load_session(&self) -> SessionContext {
        match self.store.get(SESSION_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Discarding unreadable session: {}", e);
                SessionContext::anonymous()
            }),
            Ok(None) => SessionContext::anonymous(),
            Err(e) => {
                warn!("Session read failed: {}", e);
                SessionContext::anonymous()
            }
        }
    }

    pub async fn save_session(&self, session: &SessionContext) -> RecordResult<()> {
        self.store.put(SESSION_KEY, serde_json::to_vec(session)?).await
    }

    pub async fn clear_session(&self) -> RecordResult<()> {
        self.store.remove(SESSION_KEY).await
    }
}
