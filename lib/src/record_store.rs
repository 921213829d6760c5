// lib/src/record_store.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use models::errors::{RecordError, RecordResult};
use models::identifiers::{blob_timestamp, is_record_blob};
use models::{AssetKey, AssetKind, MedicalDocumentRef, PatientRecord, RecordScope, UploadedFileRef};
use models::medical::medical_record::DEFAULT_CONTENT_TYPE;

use crate::config::{RecordBackendKind, RecordSettings};
use crate::storage_engine::{DocumentStorage, ObjectEntry, ObjectStorage, UploadOptions};

/// A stored asset resolved to its public URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    pub key: AssetKey,
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl From<AssetRef> for UploadedFileRef {
    fn from(asset: AssetRef) -> Self {
        UploadedFileRef {
            name: asset.name,
            url: asset.url,
            content_type: asset.content_type,
            uploaded_at: asset.uploaded_at,
        }
    }
}

impl From<AssetRef> for MedicalDocumentRef {
    fn from(asset: AssetRef) -> Self {
        MedicalDocumentRef {
            title: asset.name,
            url: asset.url,
            content_type: Some(asset.content_type),
            uploaded_at: asset.uploaded_at,
        }
    }
}

/// Reads and writes patient records on whichever backend is configured.
/// Assets always live in object storage.
#[derive(Debug, Clone)]
pub struct RecordStore {
    objects: Arc<dyn ObjectStorage>,
    documents: Option<Arc<dyn DocumentStorage>>,
    settings: RecordSettings,
}

impl RecordStore {
    pub fn new(
        objects: Arc<dyn ObjectStorage>,
        documents: Option<Arc<dyn DocumentStorage>>,
        settings: RecordSettings,
    ) -> RecordResult<Self> {
        if settings.backend == RecordBackendKind::DocumentDatabase && documents.is_none() {
            return Err(RecordError::ConfigurationError(
                "the document-database backend needs a document storage".to_string(),
            ));
        }
        Ok(RecordStore { objects, documents, settings })
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStorage> {
        &self.objects
    }

    pub fn backend(&self) -> RecordBackendKind {
        self.settings.backend
    }

    /// Latest stored version of the record owned by `id`.
    pub async fn get_record(&self, id: &str) -> RecordResult<PatientRecord> {
        let mut record = match self.documents_backend() {
            Some(documents) => {
                let value = documents
                    .get(&self.settings.table, id)
                    .await?
                    .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
                PatientRecord::from_value(id, value)?
            }
            None => {
                let scope = RecordScope::new(id)?;
                let prefix = scope.prefix();
                let entries = self.objects.list(&prefix).await?;
                let newest = newest_record_blob(&entries)
                    .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
                let key = AssetKey::join(&prefix, &newest.name);
                debug!("Reading record {} from {}", id, key);
                let bytes = self.objects.download(key.as_str()).await?;
                PatientRecord::from_json(key.as_str(), &bytes)?
            }
        };
        if record.id.is_empty() {
            record.id = id.to_string();
        }
        Ok(record)
    }

    /// Persists `record` for `id`. On object storage this appends a new
    /// timestamped snapshot; the returned key names it.
    pub async fn put_record(&self, id: &str, record: &PatientRecord) -> RecordResult<Option<AssetKey>> {
        if let Some(documents) = self.documents_backend() {
            let value = serde_json::to_value(record)?;
            documents.put(&self.settings.table, id, value).await?;
            return Ok(None);
        }
        let scope = RecordScope::new(id)?;
        let key = AssetKey::record_blob(&scope, Utc::now().timestamp_millis());
        self.objects
            .upload(key.as_str(), record.to_json()?, UploadOptions::json())
            .await?;
        info!("Stored record {} at {}", id, key);
        Ok(Some(key))
    }

    /// Uploads an asset and returns its public URL.
    pub async fn upload_asset(
        &self,
        key: &AssetKey,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> RecordResult<String> {
        self.objects.upload(key.as_str(), bytes, options).await?;
        Ok(self.objects.public_url(key.as_str()))
    }

    /// Assets of `kind` stored for record `id` inside `scope`.
    pub async fn list_assets(
        &self,
        scope: &RecordScope,
        id: &str,
        kind: AssetKind,
    ) -> RecordResult<Vec<AssetRef>> {
        let dir = AssetKey::asset_dir(scope, id, kind)?;
        let entries = self.objects.list(&dir).await?;
        let photo_name = match kind {
            AssetKind::ProfilePhoto => Some(AssetKey::profile_photo(scope, id)?.file_name().to_string()),
            _ => None,
        };
        Ok(entries
            .into_iter()
            .filter(|entry| photo_name.as_deref().map_or(true, |photo| entry.name == photo))
            .map(|entry| {
                let key = AssetKey::join(&dir, &entry.name);
                AssetRef {
                    url: self.objects.public_url(key.as_str()),
                    name: display_name(&entry.name, kind),
                    content_type: entry
                        .content_type
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                    uploaded_at: entry.created_at,
                    key,
                }
            })
            .collect())
    }

    /// Removes every stored version of record `id` within `scope` together
    /// with its assets. Returns the number of objects removed.
    pub async fn remove_record(&self, scope: &RecordScope, id: &str) -> RecordResult<usize> {
        if let Some(documents) = self.documents_backend() {
            documents.delete(&self.settings.table, id).await?;
        }

        let prefix = scope.prefix();
        let mut doomed = Vec::new();
        for entry in self.objects.list(&prefix).await? {
            if !is_record_blob(&entry.name) {
                continue;
            }
            let key = AssetKey::join(&prefix, &entry.name);
            match self.objects.download(key.as_str()).await {
                Ok(bytes) => match PatientRecord::from_json(key.as_str(), &bytes) {
                    Ok(record) if record.id == id => doomed.push(key.into_string()),
                    Ok(_) => {}
                    Err(e) => debug!("Skipping unreadable blob {} during removal: {}", key, e),
                },
                Err(e) => warn!("Could not inspect {} during removal: {}", key, e),
            }
        }

        for kind in [AssetKind::ProfilePhoto, AssetKind::UploadedFile, AssetKind::MedicalDocument] {
            match self.list_assets(scope, id, kind).await {
                Ok(assets) => doomed.extend(assets.into_iter().map(|asset| asset.key.into_string())),
                Err(e) => warn!("Could not list {} assets of {}: {}", kind, id, e),
            }
        }

        if !doomed.is_empty() {
            self.objects.remove(&doomed).await?;
        }
        info!("Removed record {} from scope {} ({} objects)", id, scope, doomed.len());
        Ok(doomed.len())
    }

    fn documents_backend(&self) -> Option<&Arc<dyn DocumentStorage>> {
        match self.settings.backend {
            RecordBackendKind::DocumentDatabase => self.documents.as_ref(),
            RecordBackendKind::ObjectStorage => None,
        }
    }
}

/// Record blob with the largest timestamp. Blobs without a parseable stamp
/// rank by creation time, then by name.
pub(crate) fn newest_record_blob(entries: &[ObjectEntry]) -> Option<&ObjectEntry> {
    entries
        .iter()
        .filter(|entry| is_record_blob(&entry.name))
        .max_by_key(|entry| (blob_stamp(entry), entry.name.clone()))
}

pub(crate) fn blob_stamp(entry: &ObjectEntry) -> i64 {
    blob_timestamp(&entry.name)
        .or_else(|| entry.created_at.map(|at| at.timestamp_millis()))
        .unwrap_or(0)
}

// Uploads are stored as `{stamp}-{name}`; show the original name.
fn display_name(stored: &str, kind: AssetKind) -> String {
    match kind {
        AssetKind::ProfilePhoto => stored.to_string(),
        _ => match stored.split_once('-') {
            Some((stamp, rest)) if !rest.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()) => {
                rest.to_string()
            }
            _ => stored.to_string(),
        },
    }
}
