// lib/src/patient_sync.rs
use std::fmt;
use std::sync::Arc;

use caching::CacheMirror;
use chrono::Utc;
use log::{info, warn};
use models::errors::RecordResult;
use models::{
    AssetKey, AssetKind, MedicalDocumentRef, PatientRecord, Role, SessionContext, UploadedFileRef,
};
use serde::Serialize;

use crate::record_store::RecordStore;
use crate::storage_engine::UploadOptions;

/// Where the record handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Remote,
    /// Nothing was stored yet; a default record was created remotely.
    Created,
    Cache,
    Default,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordSource::Remote => "remote",
            RecordSource::Created => "created",
            RecordSource::Cache => "cache",
            RecordSource::Default => "default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedRecord {
    pub record: PatientRecord,
    pub source: RecordSource,
}

/// The signed-in user's own record, kept in step between the remote
/// backend and the local cache mirror.
#[derive(Clone)]
pub struct PatientSync {
    store: Arc<RecordStore>,
    cache: CacheMirror,
}

impl PatientSync {
    pub fn new(store: Arc<RecordStore>, cache: CacheMirror) -> Self {
        PatientSync { store, cache }
    }

    /// Cached copy for an instant first paint.
    pub async fn cached(&self, session: &SessionContext) -> RecordResult<Option<PatientRecord>> {
        session.require_role(Role::User)?;
        Ok(self.cache.read_cache(session.user_id()).await)
    }

    /// Authoritative read. Never fails once the session is accepted: remote
    /// errors fall back to the cache, then to a default record. When the
    /// remote has nothing stored, a cached copy is pushed rather than
    /// replaced by a default.
    pub async fn load(&self, session: &SessionContext) -> RecordResult<LoadedRecord> {
        session.require_role(Role::User)?;
        let id = session.user_id();

        let remote = match self.store.get_record(id).await {
            Ok(record) => Ok((record, RecordSource::Remote)),
            Err(e) if e.is_not_found() => match self.cache.read_cache(id).await {
                Some(record) => {
                    info!("No stored record for {}; pushing the cached copy", id);
                    if let Err(e) = self.store.put_record(id, &record).await {
                        warn!("Could not push cached record of {}: {}", id, e);
                    }
                    return Ok(LoadedRecord { record, source: RecordSource::Cache });
                }
                None => {
                    info!("No stored record for {}; creating the default one", id);
                    let record = PatientRecord::default_for(id);
                    match self.store.put_record(id, &record).await {
                        Ok(_) => Ok((record, RecordSource::Created)),
                        Err(e) => Err(e),
                    }
                }
            },
            Err(e) => Err(e),
        };

        match remote {
            Ok((record, source)) => {
                if let Err(e) = self.cache.write_cache(id, &record).await {
                    warn!("Could not refresh local cache for {}: {}", id, e);
                }
                Ok(LoadedRecord { record, source })
            }
            Err(e) => {
                warn!("Remote load of {} failed: {}", id, e);
                Ok(match self.cache.read_cache(id).await {
                    Some(record) => LoadedRecord { record, source: RecordSource::Cache },
                    None => LoadedRecord {
                        record: PatientRecord::default_for(id),
                        source: RecordSource::Default,
                    },
                })
            }
        }
    }

    /// Applies `edit` to the current record. The cache is written first;
    /// a failed remote write is logged and reported through `synced`.
    pub async fn update<F>(&self, session: &SessionContext, edit: F) -> RecordResult<SyncOutcome>
    where
        F: FnOnce(&mut PatientRecord),
    {
        let mut record = self.current(session).await?;
        edit(&mut record);
        record.touch();
        let id = session.user_id();
        self.cache.write_cache(id, &record).await?;

        let synced = match self.store.put_record(id, &record).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Remote update of {} failed; kept locally: {}", id, e);
                false
            }
        };
        Ok(SyncOutcome { record, synced })
    }

    /// Explicit save. Unlike `update`, a remote failure is returned.
    pub async fn save_snapshot(
        &self,
        session: &SessionContext,
        record: &PatientRecord,
    ) -> RecordResult<Option<AssetKey>> {
        session.require_role(Role::User)?;
        let id = session.user_id();
        self.cache.write_cache(id, record).await?;
        let key = self.store.put_record(id, record).await?;
        info!("Saved snapshot of {}", id);
        Ok(key)
    }

    /// Uploads a file for the user's record and links it in.
    pub async fn upload_file(
        &self,
        session: &SessionContext,
        kind: AssetKind,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> RecordResult<SyncOutcome> {
        session.require_role(Role::User)?;
        let scope = session.scope()?;
        let id = session.user_id();
        let now = Utc::now();
        let key = AssetKey::asset(&scope, id, kind, now.timestamp_millis(), file_name)?;
        let options = match kind {
            AssetKind::ProfilePhoto => UploadOptions {
                upsert: true,
                ..UploadOptions::asset(content_type)
            },
            _ => UploadOptions::asset(content_type),
        };
        let url = self.store.upload_asset(&key, bytes, options).await?;
        info!("Uploaded {} as {}", file_name, key);

        let name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .to_string();
        self.update(session, move |record| {
            if !record.uploaded_files.iter().any(|f| f.url == url) {
                record.uploaded_files.push(UploadedFileRef {
                    name: name.clone(),
                    url: url.clone(),
                    content_type: content_type.to_string(),
                    uploaded_at: Some(now),
                });
            }
            match kind {
                AssetKind::ProfilePhoto => record.profile_photo = url,
                AssetKind::MedicalDocument => record.medical_documents.push(MedicalDocumentRef {
                    title: name,
                    url,
                    content_type: Some(content_type.to_string()),
                    uploaded_at: Some(now),
                }),
                AssetKind::UploadedFile => {}
            }
        })
        .await
    }

    async fn current(&self, session: &SessionContext) -> RecordResult<PatientRecord> {
        match self.cached(session).await? {
            Some(record) => Ok(record),
            None => Ok(self.load(session).await?.record),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub record: PatientRecord,
    /// Whether the remote backend accepted the write.
    pub synced: bool,
}
