// lib/src/aggregation.rs
//! Rebuilds full patient views from the blobs and assets stored under a
//! scope. Per-record failures are logged and dropped; only the listing of
//! the scope itself can fail a batch.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error, info, warn};
use models::errors::RecordResult;
use models::identifiers::is_record_blob;
use models::{
    AssetKey, AssetKind, BloodGroup, Gender, MaritalStatus, MedicalDocumentRef, PatientRecord,
    RecordScope, Role, SessionContext, UploadedFileRef,
};
use tokio::sync::Semaphore;

use crate::record_store::{blob_stamp, AssetRef, RecordStore};
use crate::storage_engine::{ObjectEntry, ObjectStorage};

/// A parsed blob together with where it came from.
#[derive(Debug, Clone)]
pub struct FetchedBlob<T> {
    pub key: AssetKey,
    /// Index of the blob in the prefix listing.
    pub position: usize,
    pub stamp: i64,
    pub value: T,
}

/// Runs `work` for every item concurrently, at most `max_in_flight` at a
/// time when a cap is given. Results keep the order of `items`.
pub async fn fan_out<I, T, F, Fut>(items: Vec<I>, max_in_flight: Option<usize>, work: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let limiter = max_in_flight.filter(|cap| *cap > 0).map(Semaphore::new);
    let limiter = limiter.as_ref();
    let tasks = items.into_iter().map(|item| {
        let task = work(item);
        async move {
            let _permit = match limiter {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };
            task.await
        }
    });
    join_all(tasks).await
}

/// Lists `prefix`, downloads every entry whose name passes `is_match` and
/// parses it with `parse`. Entries that fail to download or parse are
/// logged and skipped.
pub async fn fetch_json_blobs<T, P>(
    storage: &dyn ObjectStorage,
    prefix: &str,
    is_match: P,
    max_in_flight: Option<usize>,
    parse: fn(&str, &[u8]) -> RecordResult<T>,
) -> RecordResult<Vec<FetchedBlob<T>>>
where
    P: Fn(&str) -> bool,
{
    let entries: Vec<(usize, ObjectEntry)> = storage
        .list(prefix)
        .await?
        .into_iter()
        .filter(|entry| is_match(&entry.name))
        .enumerate()
        .collect();
    debug!("Fetching {} blobs under {}", entries.len(), prefix);

    let fetched = fan_out(entries, max_in_flight, |(position, entry)| async move {
        let key = AssetKey::join(prefix, &entry.name);
        let bytes = match storage.download(key.as_str()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: download failed: {}", key, e);
                return None;
            }
        };
        match parse(key.as_str(), &bytes) {
            Ok(value) => Some(FetchedBlob {
                stamp: blob_stamp(&entry),
                key,
                position,
                value,
            }),
            Err(e) => {
                error!("Skipping {}: {}", key, e);
                None
            }
        }
    })
    .await;

    Ok(fetched.into_iter().flatten().collect())
}

/// Admin dashboard search box and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub marital_status: Option<MaritalStatus>,
}

impl PatientFilter {
    pub fn matches(&self, record: &PatientRecord) -> bool {
        let name_matches = match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => record
                .full_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };
        name_matches
            && self.gender.map_or(true, |g| record.gender == g)
            && self.blood_group.map_or(true, |b| record.blood_group == b)
            && self.marital_status.map_or(true, |m| record.marital_status == m)
    }

    pub fn apply(&self, records: Vec<PatientRecord>) -> Vec<PatientRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PatientAggregator {
    store: Arc<RecordStore>,
    max_in_flight: Option<usize>,
}

impl PatientAggregator {
    pub fn new(store: Arc<RecordStore>, max_in_flight: Option<usize>) -> Self {
        PatientAggregator { store, max_in_flight }
    }

    /// Every patient stored under `scope`, one entry per record id, with
    /// asset URLs resolved. Restricted to admins and doctors.
    pub async fn load_patients(
        &self,
        session: &SessionContext,
        scope: &RecordScope,
    ) -> RecordResult<Vec<PatientRecord>> {
        session.require_any(&[Role::Admin, Role::Doctor])?;
        self.aggregate(scope).await
    }

    pub async fn aggregate(&self, scope: &RecordScope) -> RecordResult<Vec<PatientRecord>> {
        let blobs = fetch_json_blobs(
            self.store.objects().as_ref(),
            &scope.prefix(),
            is_record_blob,
            self.max_in_flight,
            PatientRecord::from_json,
        )
        .await?;
        let listed = blobs.len();
        let latest = latest_per_patient(blobs);

        let records = fan_out(latest, self.max_in_flight, |mut record| async move {
            self.resolve_assets(scope, &mut record).await;
            record
        })
        .await;
        info!(
            "Aggregated {} patients from {} readable blobs in scope {}",
            records.len(),
            listed,
            scope
        );
        Ok(records)
    }

    async fn resolve_assets(&self, scope: &RecordScope, record: &mut PatientRecord) {
        if record.id.is_empty() {
            debug!("Record without id in scope {}; assets left unresolved", scope);
            return;
        }
        let id = record.id.clone();
        let (photo, uploads, documents) = futures::join!(
            self.store.list_assets(scope, &id, AssetKind::ProfilePhoto),
            self.store.list_assets(scope, &id, AssetKind::UploadedFile),
            self.store.list_assets(scope, &id, AssetKind::MedicalDocument),
        );

        match photo {
            Ok(assets) => {
                if let Some(photo) = assets.into_iter().next() {
                    record.profile_photo = photo.url;
                }
            }
            Err(e) => warn!("Could not resolve photo of {}: {}", id, e),
        }
        match uploads {
            Ok(assets) => merge_by_url(&mut record.uploaded_files, assets),
            Err(e) => warn!("Could not list uploads of {}: {}", id, e),
        }
        match documents {
            Ok(assets) => merge_by_url(&mut record.medical_documents, assets),
            Err(e) => warn!("Could not list documents of {}: {}", id, e),
        }
    }
}

trait HasUrl {
    fn url(&self) -> &str;
}

impl HasUrl for UploadedFileRef {
    fn url(&self) -> &str {
        &self.url
    }
}

impl HasUrl for MedicalDocumentRef {
    fn url(&self) -> &str {
        &self.url
    }
}

fn merge_by_url<R>(stored: &mut Vec<R>, listed: Vec<AssetRef>)
where
    R: HasUrl + From<AssetRef>,
{
    for asset in listed {
        if !stored.iter().any(|existing| existing.url() == asset.url) {
            stored.push(R::from(asset));
        }
    }
}

/// Keeps the newest blob per record id. Records without an id are kept as
/// they are. The result follows the listing position of the kept blobs.
fn latest_per_patient(blobs: Vec<FetchedBlob<PatientRecord>>) -> Vec<PatientRecord> {
    let mut winners: HashMap<String, FetchedBlob<PatientRecord>> = HashMap::new();
    let mut kept: Vec<FetchedBlob<PatientRecord>> = Vec::new();
    for blob in blobs {
        if blob.value.id.is_empty() {
            kept.push(blob);
            continue;
        }
        let superseded = winners.get(&blob.value.id).map_or(false, |current| {
            (current.stamp, current.position) > (blob.stamp, blob.position)
        });
        if superseded {
            debug!("Dropping superseded blob {}", blob.key);
        } else {
            winners.insert(blob.value.id.clone(), blob);
        }
    }
    kept.extend(winners.into_values());
    kept.sort_by_key(|blob| blob.position);
    kept.into_iter().map(|blob| blob.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordSettings;
    use crate::storage_engine::{InMemoryObjectStorage, UploadOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<InMemoryObjectStorage>, PatientAggregator) {
        let objects = Arc::new(InMemoryObjectStorage::new("new"));
        let store = RecordStore::new(objects.clone(), None, RecordSettings::default()).unwrap();
        (objects, PatientAggregator::new(Arc::new(store), None))
    }

    fn scope() -> RecordScope {
        RecordScope::new("demo-user").unwrap()
    }

    async fn put_blob(objects: &InMemoryObjectStorage, name: &str, bytes: Vec<u8>) {
        objects
            .upload(&format!("users/demo-user/{}", name), bytes, UploadOptions::json())
            .await
            .unwrap();
    }

    fn patient(id: &str, name: &str) -> Vec<u8> {
        let mut record = PatientRecord::default_for(id);
        record.full_name = name.to_string();
        record.to_json().unwrap()
    }

    fn admin() -> SessionContext {
        SessionContext::authenticated(Role::Admin, "demo-user")
    }

    #[tokio::test]
    async fn malformed_blob_is_dropped_from_batch() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "1_data.json", patient("p-1", "Ann")).await;
        put_blob(&objects, "2_data.json", b"{ not json".to_vec()).await;
        put_blob(&objects, "3_data.json", patient("p-2", "Ben")).await;

        let records = aggregator.load_patients(&admin(), &scope()).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Ben"]);
    }

    #[tokio::test]
    async fn only_data_blobs_are_considered() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "a_data.json", patient("a", "A")).await;
        put_blob(&objects, "b_data.json", patient("b", "B")).await;
        put_blob(&objects, "notes.txt", patient("c", "C")).await;

        let records = aggregator.aggregate(&scope()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.id != "c"));
    }

    #[tokio::test]
    async fn failed_download_does_not_affect_siblings() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "1_data.json", patient("p-1", "Ann")).await;
        put_blob(&objects, "2_data.json", patient("p-2", "Ben")).await;
        objects.fail_downloads_of("users/demo-user/1_data.json").await;

        let records = aggregator.aggregate(&scope()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "p-2");
    }

    #[tokio::test]
    async fn listing_failure_fails_the_batch() {
        let (objects, aggregator) = setup();
        objects.set_offline(true);
        assert!(aggregator.aggregate(&scope()).await.is_err());
    }

    #[tokio::test]
    async fn newest_blob_wins_per_patient() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "1000_data.json", patient("p-1", "Old Name")).await;
        put_blob(&objects, "2000_data.json", patient("p-2", "Ben")).await;
        put_blob(&objects, "3000_data.json", patient("p-1", "New Name")).await;

        let records = aggregator.aggregate(&scope()).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ben", "New Name"]);
    }

    #[tokio::test]
    async fn output_never_exceeds_listed_blobs() {
        let (objects, aggregator) = setup();
        for i in 0..6 {
            put_blob(&objects, &format!("{}_data.json", i), patient(&format!("p-{}", i % 4), "X")).await;
        }
        let records = aggregator.aggregate(&scope()).await.unwrap();
        assert!(records.len() <= 6);
        assert_eq!(records.len(), 4);
    }

    #[tokio::test]
    async fn assets_are_resolved_and_merged() {
        let (objects, aggregator) = setup();
        let mut record = PatientRecord::default_for("p-1");
        record.uploaded_files.push(UploadedFileRef {
            name: "external.pdf".into(),
            url: "https://elsewhere/external.pdf".into(),
            content_type: "application/pdf".into(),
            uploaded_at: None,
        });
        put_blob(&objects, "1_data.json", record.to_json().unwrap()).await;
        objects
            .upload("users/demo-user/files/p-1_person.jpg", vec![0], UploadOptions::asset("image/jpeg"))
            .await
            .unwrap();
        objects
            .upload(
                "users/demo-user/files/p-1/uploads/5-lab.pdf",
                vec![0],
                UploadOptions::asset("application/pdf"),
            )
            .await
            .unwrap();
        objects
            .upload(
                "users/demo-user/files/p-1/medical_documents/6-xray.png",
                vec![0],
                UploadOptions::asset("image/png"),
            )
            .await
            .unwrap();

        let records = aggregator.aggregate(&scope()).await.unwrap();
        let record = &records[0];
        assert_eq!(record.profile_photo, "memory://new/users/demo-user/files/p-1_person.jpg");
        assert_eq!(record.uploaded_files.len(), 2);
        assert_eq!(record.uploaded_files[1].name, "lab.pdf");
        assert_eq!(record.medical_documents.len(), 1);
        assert_eq!(record.medical_documents[0].title, "xray.png");
    }

    #[tokio::test]
    async fn photo_stays_empty_without_photo_object() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "1_data.json", patient("p-1", "Ann")).await;
        let records = aggregator.aggregate(&scope()).await.unwrap();
        assert!(records[0].profile_photo.is_empty());
    }

    #[tokio::test]
    async fn plain_users_cannot_aggregate() {
        let (_, aggregator) = setup();
        let user = SessionContext::authenticated(Role::User, "demo-user");
        assert!(aggregator.load_patients(&user, &scope()).await.is_err());
        assert!(aggregator.load_patients(&SessionContext::anonymous(), &scope()).await.is_err());
    }

    #[tokio::test]
    async fn record_without_id_passes_through_unresolved() {
        let (objects, aggregator) = setup();
        put_blob(&objects, "1_data.json", br#"{"fullName":"No Id"}"#.to_vec()).await;
        put_blob(&objects, "2_data.json", patient("p-2", "Ben")).await;
        objects
            .upload("users/demo-user/files/_person.jpg", vec![0], UploadOptions::asset("image/jpeg"))
            .await
            .unwrap();

        let records = aggregator.aggregate(&scope()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].full_name, "No Id");
        assert!(records[0].id.is_empty());
        assert!(records[0].profile_photo.is_empty());
        assert!(records[0].uploaded_files.is_empty());
    }

    /// Delegates to the in-memory engine and records how many downloads
    /// overlap.
    #[derive(Debug)]
    struct CountingStorage {
        inner: InMemoryObjectStorage,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ObjectStorage for CountingStorage {
        async fn list(&self, prefix: &str) -> RecordResult<Vec<ObjectEntry>> {
            self.inner.list(prefix).await
        }

        async fn download(&self, key: &str) -> RecordResult<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let result = self.inner.download(key).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn upload(&self, key: &str, bytes: Vec<u8>, options: UploadOptions) -> RecordResult<()> {
            self.inner.upload(key, bytes, options).await
        }

        async fn remove(&self, keys: &[String]) -> RecordResult<()> {
            self.inner.remove(keys).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }

        fn get_type(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn aggregator_cap_limits_concurrent_downloads() {
        let storage = Arc::new(CountingStorage {
            inner: InMemoryObjectStorage::new("new"),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        for i in 0..6 {
            put_blob(&storage.inner, &format!("{}_data.json", i), patient(&format!("p-{}", i), "X")).await;
        }
        let store = RecordStore::new(storage.clone(), None, RecordSettings::default()).unwrap();
        let aggregator = PatientAggregator::new(Arc::new(store), Some(1));

        let records = aggregator.aggregate(&scope()).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2", "p-3", "p-4", "p-5"]);
        assert_eq!(storage.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fan_out_respects_cap_and_order() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let results = fan_out((0..8).collect(), Some(2), |i: usize| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i * 10
            }
        })
        .await;
        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn filter_matches_name_and_attributes() {
        let mut record = PatientRecord::default_for("p-1");
        record.full_name = "Maria Lopez".into();
        record.blood_group = BloodGroup::ONegative;

        let by_name = PatientFilter { search: Some("lopez".into()), ..Default::default() };
        assert!(by_name.matches(&record));

        let by_group = PatientFilter { blood_group: Some(BloodGroup::APositive), ..Default::default() };
        assert!(!by_group.matches(&record));

        assert!(PatientFilter::default().matches(&record));
    }
}
