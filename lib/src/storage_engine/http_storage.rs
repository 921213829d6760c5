// lib/src/storage_engine/http_storage.rs
//! Clients for the hosted backend: its storage REST API for objects and its
//! table REST API for documents.
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use models::errors::{RecordError, RecordResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::StorageSettings;
use crate::storage_engine::storage_engine::require_url;
use crate::storage_engine::{DocumentStorage, ObjectEntry, ObjectStorage, UploadOptions};

fn http_err(e: reqwest::Error) -> RecordError {
    RecordError::StorageError(format!("HTTP request failed: {}", e))
}

fn build_url(base: &str, segments: &[&str]) -> RecordResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| RecordError::ConfigurationError(format!("invalid storage url '{}': {}", base, e)))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| RecordError::ConfigurationError(format!("storage url '{}' cannot be a base", base)))?;
        path.pop_if_empty();
        for segment in segments {
            path.extend(segment.split('/').filter(|s| !s.is_empty()));
        }
    }
    Ok(url)
}

fn auth_headers(anon_key: &str) -> RecordResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if anon_key.is_empty() {
        return Ok(headers);
    }
    let key = HeaderValue::from_str(anon_key)
        .map_err(|e| RecordError::ConfigurationError(format!("invalid anon key: {}", e)))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
        .map_err(|e| RecordError::ConfigurationError(format!("invalid anon key: {}", e)))?;
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// Which REST API a request went to. Only the storage API reports missing
/// objects; the table API answers a missing row with an empty array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Object,
    Table,
}

fn classify_failure(route: Route, status: StatusCode, body: &str, what: &str) -> RecordError {
    let error_code = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string));
    // The storage API reports a missing object as 400 with `"error": "not_found"`;
    // a missing bucket carries its own error code and stays a storage error.
    let missing_object = route == Route::Object
        && match error_code.as_deref() {
            Some(code) => code == "not_found",
            None => status == StatusCode::NOT_FOUND,
        };
    if missing_object {
        return RecordError::NotFound(what.to_string());
    }
    warn!("{} failed with {}: {}", what, status, body);
    RecordError::StorageError(format!("{} failed with {}: {}", what, status, body))
}

async fn send(request: RequestBuilder, route: Route, what: &str) -> RecordResult<Response> {
    let response = request.send().await.map_err(http_err)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(route, status, &body, what))
}

/// Requests pages of `page_size` at growing offsets until a short page
/// comes back.
async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch_page: F) -> RecordResult<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = RecordResult<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut collected = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch_page(offset).await?;
        let received = page.len();
        collected.extend(page);
        if received < page_size {
            return Ok(collected);
        }
        offset += received;
    }
}

#[derive(Debug, Deserialize)]
struct RemoteObject {
    name: String,
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    metadata: Option<Value>,
}

impl RemoteObject {
    fn into_entry(self) -> Option<ObjectEntry> {
        // Folders come back without an id.
        self.id.as_ref()?;
        let metadata = self.metadata.unwrap_or(Value::Null);
        let content_type = metadata
            .get("mimetype")
            .or_else(|| metadata.get("contentType"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let size = metadata.get("size").and_then(Value::as_u64);
        Some(ObjectEntry {
            name: self.name,
            created_at: self.created_at,
            content_type,
            size,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: Client,
    base_url: String,
    bucket: String,
    headers: HeaderMap,
    list_limit: usize,
}

impl HttpObjectStorage {
    pub fn new(settings: &StorageSettings) -> RecordResult<Self> {
        let base_url = require_url(settings)?.to_string();
        build_url(&base_url, &[])?;
        Ok(HttpObjectStorage {
            client: Client::new(),
            base_url,
            bucket: settings.bucket.clone(),
            headers: auth_headers(&settings.anon_key)?,
            list_limit: settings.list_limit,
        })
    }

    fn object_url(&self, key: &str) -> RecordResult<Url> {
        build_url(&self.base_url, &["storage/v1/object", &self.bucket, key])
    }

    /// One page of the listing, folders included so the page length stays
    /// comparable with the limit.
    async fn list_page(&self, prefix: &str, offset: usize) -> RecordResult<Vec<RemoteObject>> {
        let url = build_url(&self.base_url, &["storage/v1/object/list", &self.bucket])?;
        let body = json!({
            "prefix": prefix.trim_end_matches('/'),
            "limit": self.list_limit.max(1),
            "offset": offset,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let request = self.client.post(url).headers(self.headers.clone()).json(&body);
        send(request, Route::Object, &format!("list {}", prefix))
            .await?
            .json()
            .await
            .map_err(http_err)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn list(&self, prefix: &str) -> RecordResult<Vec<ObjectEntry>> {
        debug!("Listing {}/{}", self.bucket, prefix);
        let objects = collect_pages(self.list_limit, |offset| self.list_page(prefix, offset)).await?;
        Ok(objects.into_iter().filter_map(RemoteObject::into_entry).collect())
    }

    async fn download(&self, key: &str) -> RecordResult<Vec<u8>> {
        let request = self.client.get(self.object_url(key)?).headers(self.headers.clone());
        let bytes = send(request, Route::Object, key).await?.bytes().await.map_err(http_err)?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, options: UploadOptions) -> RecordResult<()> {
        let mut request = self
            .client
            .post(self.object_url(key)?)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, options.content_type)
            .header("x-upsert", if options.upsert { "true" } else { "false" })
            .body(bytes);
        if let Some(cache_control) = options.cache_control {
            request = request.header(CACHE_CONTROL, format!("max-age={}", cache_control));
        }
        send(request, Route::Object, &format!("upload {}", key)).await?;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> RecordResult<()> {
        let url = build_url(&self.base_url, &["storage/v1/object", &self.bucket])?;
        let request = self
            .client
            .delete(url)
            .headers(self.headers.clone())
            .json(&json!({ "prefixes": keys }));
        send(request, Route::Object, "remove objects").await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        build_url(&self.base_url, &["storage/v1/object/public", &self.bucket, key])
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, key))
    }

    fn get_type(&self) -> &'static str {
        "http"
    }
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStorage {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpDocumentStorage {
    pub fn new(settings: &StorageSettings) -> RecordResult<Self> {
        let base_url = require_url(settings)?.to_string();
        build_url(&base_url, &[])?;
        Ok(HttpDocumentStorage {
            client: Client::new(),
            base_url,
            headers: auth_headers(&settings.anon_key)?,
        })
    }

    fn row_url(&self, table: &str, id: &str) -> RecordResult<Url> {
        let mut url = build_url(&self.base_url, &["rest/v1", table])?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        Ok(url)
    }
}

#[async_trait]
impl DocumentStorage for HttpDocumentStorage {
    async fn get(&self, table: &str, id: &str) -> RecordResult<Option<Value>> {
        let mut url = self.row_url(table, id)?;
        url.query_pairs_mut().append_pair("select", "*");
        let request = self.client.get(url).headers(self.headers.clone());
        let rows: Vec<Value> = send(request, Route::Table, &format!("select {}", id))
            .await?
            .json()
            .await
            .map_err(http_err)?;
        Ok(rows.into_iter().next())
    }

    async fn put(&self, table: &str, id: &str, mut document: Value) -> RecordResult<()> {
        if let Some(object) = document.as_object_mut() {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }
        let url = build_url(&self.base_url, &["rest/v1", table])?;
        let request = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&document);
        send(request, Route::Table, &format!("upsert {}", id)).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> RecordResult<()> {
        let request = self.client.delete(self.row_url(table, id)?).headers(self.headers.clone());
        send(request, Route::Table, &format!("delete {}", id)).await?;
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageEngineType;

    fn settings() -> StorageSettings {
        StorageSettings {
            engine: StorageEngineType::Http,
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            ..StorageSettings::default()
        }
    }

    #[test]
    fn public_url_encodes_key_segments() {
        let storage = HttpObjectStorage::new(&settings()).unwrap();
        assert_eq!(
            storage.public_url("users/demo-user/files/p1/uploads/1-blood test.pdf"),
            "https://demo.supabase.co/storage/v1/object/public/new/users/demo-user/files/p1/uploads/1-blood%20test.pdf"
        );
    }

    #[test]
    fn row_url_filters_by_id() {
        let docs = HttpDocumentStorage::new(&settings()).unwrap();
        let url = docs.row_url("patients", "demo-user").unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/patients?id=eq.demo-user");
    }

    #[test]
    fn missing_url_is_a_configuration_error() {
        let err = HttpObjectStorage::new(&StorageSettings::default()).unwrap_err();
        assert!(matches!(err, RecordError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn listing_walks_every_page() {
        let names: Vec<String> = (0..250).map(|i| format!("{:04}_data.json", i)).collect();
        let mut offsets = Vec::new();
        let listed = collect_pages(100, |offset| {
            offsets.push(offset);
            let page: Vec<String> = names.iter().skip(offset).take(100).cloned().collect();
            async move { Ok(page) }
        })
        .await
        .unwrap();
        assert_eq!(offsets, vec![0, 100, 200]);
        assert_eq!(listed.len(), 250);
        assert_eq!(listed.last().map(String::as_str), Some("0249_data.json"));
    }

    #[tokio::test]
    async fn full_last_page_triggers_one_more_request() {
        let mut calls = 0;
        let listed = collect_pages(100, |offset| {
            calls += 1;
            let page: Vec<usize> = (offset..200).take(100).collect();
            async move { Ok(page) }
        })
        .await
        .unwrap();
        assert_eq!(listed.len(), 200);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn page_failure_fails_the_listing() {
        let result: RecordResult<Vec<u8>> = collect_pages(2, |offset| async move {
            if offset == 0 {
                Ok(vec![1, 2])
            } else {
                Err(RecordError::StorageError("boom".to_string()))
            }
        })
        .await;
        assert!(matches!(result, Err(RecordError::StorageError(_))));
    }

    #[test]
    fn missing_object_is_not_found() {
        let body = r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#;
        let err = classify_failure(Route::Object, StatusCode::BAD_REQUEST, body, "k");
        assert!(err.is_not_found());
        assert!(classify_failure(Route::Object, StatusCode::NOT_FOUND, "", "k").is_not_found());
    }

    #[test]
    fn missing_bucket_or_table_is_a_storage_error() {
        let bucket = r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#;
        let err = classify_failure(Route::Object, StatusCode::BAD_REQUEST, bucket, "list users/demo-user");
        assert!(matches!(err, RecordError::StorageError(_)));

        let table = r#"{"code":"42P01","message":"relation \"public.patients\" does not exist"}"#;
        let err = classify_failure(Route::Table, StatusCode::NOT_FOUND, table, "select demo-user");
        assert!(matches!(err, RecordError::StorageError(_)));
    }

    #[test]
    fn folders_are_dropped_from_listings() {
        let folder: RemoteObject = serde_json::from_value(json!({
            "name": "files", "id": null, "created_at": null, "metadata": null
        }))
        .unwrap();
        assert!(folder.into_entry().is_none());

        let file: RemoteObject = serde_json::from_value(json!({
            "name": "1_data.json",
            "id": "abc",
            "created_at": "2024-05-01T10:00:00.123+00:00",
            "metadata": { "mimetype": "application/json", "size": 12 }
        }))
        .unwrap();
        let entry = file.into_entry().unwrap();
        assert_eq!(entry.content_type.as_deref(), Some("application/json"));
        assert_eq!(entry.size, Some(12));
    }
}
