// lib/src/medication.rs
use std::sync::Arc;

use chrono::Utc;
use log::info;
use models::errors::{RecordError, RecordResult};
use models::identifiers::is_medication_blob;
use models::{AssetKey, Medication, MedicationDraft, SessionContext};

use crate::aggregation::{fetch_json_blobs, FetchedBlob};
use crate::storage_engine::{ObjectStorage, UploadOptions};

fn parse_medication(key: &str, bytes: &[u8]) -> RecordResult<Medication> {
    serde_json::from_slice(bytes).map_err(|e| RecordError::parse(key, e))
}

/// A signed-in user's medication timetable. Each entry is its own blob
/// under `medication-timetable/{user}`.
#[derive(Debug, Clone)]
pub struct MedicationTimetable {
    storage: Arc<dyn ObjectStorage>,
    max_in_flight: Option<usize>,
}

impl MedicationTimetable {
    pub fn new(storage: Arc<dyn ObjectStorage>, max_in_flight: Option<usize>) -> Self {
        MedicationTimetable { storage, max_in_flight }
    }

    pub async fn list(&self, session: &SessionContext) -> RecordResult<Vec<Medication>> {
        Ok(self
            .fetch(session)
            .await?
            .into_iter()
            .map(|blob| blob.value)
            .collect())
    }

    pub async fn add(&self, session: &SessionContext, draft: MedicationDraft) -> RecordResult<Medication> {
        let user_id = signed_in_user(session)?;
        if draft.name.trim().is_empty() {
            return Err(RecordError::InvalidData("medication name is required".to_string()));
        }
        let medication = Medication::from_draft(draft, user_id);
        let key = AssetKey::medication_blob(user_id, Utc::now().timestamp_millis())?;
        let bytes = serde_json::to_vec_pretty(&medication)?;
        self.storage
            .upload(key.as_str(), bytes, UploadOptions::json())
            .await?;
        info!("Added medication {} for {}", medication.id, user_id);
        Ok(medication)
    }

    /// Deletes every blob holding medication `id`. Returns whether any did.
    pub async fn remove(&self, session: &SessionContext, id: &str) -> RecordResult<bool> {
        let keys: Vec<String> = self
            .fetch(session)
            .await?
            .into_iter()
            .filter(|blob| blob.value.id == id)
            .map(|blob| blob.key.into_string())
            .collect();
        if keys.is_empty() {
            return Ok(false);
        }
        self.storage.remove(&keys).await?;
        info!("Removed medication {} ({} blobs)", id, keys.len());
        Ok(true)
    }

    async fn fetch(&self, session: &SessionContext) -> RecordResult<Vec<FetchedBlob<Medication>>> {
        let user_id = signed_in_user(session)?;
        let dir = AssetKey::medication_dir(user_id)?;
        fetch_json_blobs(
            self.storage.as_ref(),
            &dir,
            is_medication_blob,
            self.max_in_flight,
            parse_medication,
        )
        .await
    }
}

fn signed_in_user(session: &SessionContext) -> RecordResult<&str> {
    match session.role() {
        Some(_) => Ok(session.user_id()),
        None => Err(RecordError::Auth("sign in to manage medications".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryObjectStorage;
    use models::Role;

    fn timetable() -> (Arc<InMemoryObjectStorage>, MedicationTimetable) {
        let storage = Arc::new(InMemoryObjectStorage::new("new"));
        (storage.clone(), MedicationTimetable::new(storage, None))
    }

    fn user() -> SessionContext {
        SessionContext::authenticated(Role::User, "u1")
    }

    fn draft(name: &str) -> MedicationDraft {
        MedicationDraft {
            name: name.to_string(),
            dosage: "10mg".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn added_medications_are_listed() {
        let (_, timetable) = timetable();
        let added = timetable.add(&user(), draft("Lisinopril")).await.unwrap();

        let listed = timetable.list(&user()).await.unwrap();
        assert_eq!(listed, vec![added]);
    }

    #[tokio::test]
    async fn remove_deletes_only_matching_entry() {
        let (storage, timetable) = timetable();
        let keep = timetable.add(&user(), draft("Aspirin")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let gone = timetable.add(&user(), draft("Ibuprofen")).await.unwrap();

        assert!(timetable.remove(&user(), &gone.id).await.unwrap());
        assert!(!timetable.remove(&user(), "missing").await.unwrap());
        assert_eq!(timetable.list(&user()).await.unwrap(), vec![keep]);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn foreign_blobs_and_garbage_are_ignored() {
        let (storage, timetable) = timetable();
        storage
            .upload("medication-timetable/u1/notes.txt", b"hi".to_vec(), UploadOptions::json())
            .await
            .unwrap();
        storage
            .upload("medication-timetable/u1/1_medication.json", b"[".to_vec(), UploadOptions::json())
            .await
            .unwrap();
        assert!(timetable.list(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_session_is_rejected() {
        let (_, timetable) = timetable();
        let err = timetable.add(&SessionContext::anonymous(), draft("x")).await.unwrap_err();
        assert!(matches!(err, RecordError::Auth(_)));
    }

    #[tokio::test]
    async fn blank_name_is_invalid() {
        let (_, timetable) = timetable();
        assert!(timetable.add(&user(), draft("  ")).await.is_err());
    }
}
