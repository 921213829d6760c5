// models/src/identifiers.rs
//! Storage keys for everything that belongs to a patient record.
//!
//! The record blob, the profile photo and the per-kind asset listings all
//! live under the same identity. Every key is built here so the naming
//! scheme cannot drift between writers and readers.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

pub const USERS_ROOT: &str = "users";
pub const MEDICATION_ROOT: &str = "medication-timetable";
pub const FILES_DIR: &str = "files";
pub const RECORD_BLOB_SUFFIX: &str = "_data.json";
pub const MEDICATION_BLOB_SUFFIX: &str = "_medication.json";
pub const PROFILE_PHOTO_SUFFIX: &str = "_person.jpg";

fn segment(value: &str) -> ValidationResult<&str> {
    if value.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    if value.contains('/') || value == "." || value == ".." {
        return Err(ValidationError::InvalidSegment(value.to_string()));
    }
    Ok(value)
}

/// Namespace under which record blobs are enumerated, `users/{scope}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordScope(String);

impl RecordScope {
    pub fn new(namespace: impl Into<String>) -> ValidationResult<Self> {
        let namespace = namespace.into();
        segment(&namespace)?;
        Ok(RecordScope(namespace))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listing prefix for the scope's record blobs.
    pub fn prefix(&self) -> String {
        format!("{}/{}", USERS_ROOT, self.0)
    }

    pub fn files_prefix(&self) -> String {
        format!("{}/{}/{}", USERS_ROOT, self.0, FILES_DIR)
    }
}

impl FromStr for RecordScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for RecordScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    ProfilePhoto,
    UploadedFile,
    MedicalDocument,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::ProfilePhoto => "profile-photo",
            AssetKind::UploadedFile => "uploaded-file",
            AssetKind::MedicalDocument => "medical-documents",
        }
    }

    fn directory(&self) -> Option<&'static str> {
        match self {
            AssetKind::ProfilePhoto => None,
            AssetKind::UploadedFile => Some("uploads"),
            AssetKind::MedicalDocument => Some("medical_documents"),
        }
    }
}

impl FromStr for AssetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "profile-photo" | "photo" => Ok(AssetKind::ProfilePhoto),
            "uploaded-file" | "upload" | "uploads" | "file" => Ok(AssetKind::UploadedFile),
            "medical-documents" | "medical-document" | "document" => Ok(AssetKind::MedicalDocument),
            _ => Err(ValidationError::UnknownVariant {
                kind: "asset kind".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified object key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// `users/{scope}/{timestamp}_data.json`
    pub fn record_blob(scope: &RecordScope, timestamp_millis: i64) -> Self {
        AssetKey(format!("{}/{}{}", scope.prefix(), timestamp_millis, RECORD_BLOB_SUFFIX))
    }

    /// `users/{scope}/files/{id}_person.jpg`
    pub fn profile_photo(scope: &RecordScope, record_id: &str) -> ValidationResult<Self> {
        let record_id = segment(record_id)?;
        Ok(AssetKey(format!("{}/{}{}", scope.files_prefix(), record_id, PROFILE_PHOTO_SUFFIX)))
    }

    /// Key of a newly uploaded asset. Profile photos always land on the same
    /// key; other kinds are stamped so repeated uploads never collide.
    pub fn asset(
        scope: &RecordScope,
        record_id: &str,
        kind: AssetKind,
        timestamp_millis: i64,
        file_name: &str,
    ) -> ValidationResult<Self> {
        match kind.directory() {
            None => Self::profile_photo(scope, record_id),
            Some(_) => {
                let file_name = segment(base_name(file_name))?;
                Ok(AssetKey(format!(
                    "{}/{}-{}",
                    Self::asset_dir(scope, record_id, kind)?,
                    timestamp_millis,
                    file_name
                )))
            }
        }
    }

    /// Listing prefix that holds every asset of `kind` for one record. For
    /// profile photos this is the shared files directory.
    pub fn asset_dir(scope: &RecordScope, record_id: &str, kind: AssetKind) -> ValidationResult<String> {
        let record_id = segment(record_id)?;
        Ok(match kind.directory() {
            None => scope.files_prefix(),
            Some(dir) => format!("{}/{}/{}", scope.files_prefix(), record_id, dir),
        })
    }

    /// `medication-timetable/{user}/{timestamp}_medication.json`
    pub fn medication_blob(user_id: &str, timestamp_millis: i64) -> ValidationResult<Self> {
        Ok(AssetKey(format!(
            "{}/{}{}",
            Self::medication_dir(user_id)?,
            timestamp_millis,
            MEDICATION_BLOB_SUFFIX
        )))
    }

    pub fn medication_dir(user_id: &str) -> ValidationResult<String> {
        Ok(format!("{}/{}", MEDICATION_ROOT, segment(user_id)?))
    }

    /// Joins a listing prefix with an entry name returned by that listing.
    pub fn join(prefix: &str, name: &str) -> Self {
        AssetKey(format!("{}/{}", prefix.trim_end_matches('/'), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        base_name(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn is_record_blob(name: &str) -> bool {
    name.ends_with(RECORD_BLOB_SUFFIX)
}

pub fn is_medication_blob(name: &str) -> bool {
    name.ends_with(MEDICATION_BLOB_SUFFIX)
}

/// Millisecond stamp leading a blob name such as `1712000000000_data.json`.
pub fn blob_timestamp(name: &str) -> Option<i64> {
    let name = base_name(name);
    let digits: &str = name.split('_').next()?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> RecordScope {
        RecordScope::new("demo-user").unwrap()
    }

    #[test]
    fn should_not_create_empty_scope() {
        assert_eq!(RecordScope::new("").unwrap_err(), ValidationError::EmptyIdentifier);
    }

    #[test]
    fn should_reject_nested_scope() {
        assert!(RecordScope::new("a/b").is_err());
        assert!(RecordScope::new("..").is_err());
    }

    #[test]
    fn record_blob_lives_under_scope() {
        let key = AssetKey::record_blob(&scope(), 1_700_000_000_000);
        assert_eq!(key.as_str(), "users/demo-user/1700000000000_data.json");
        assert!(is_record_blob(key.file_name()));
        assert_eq!(blob_timestamp(key.as_str()), Some(1_700_000_000_000));
    }

    #[test]
    fn photo_and_asset_dirs_share_identity() {
        let photo = AssetKey::profile_photo(&scope(), "p1").unwrap();
        assert_eq!(photo.as_str(), "users/demo-user/files/p1_person.jpg");

        let photo_dir = AssetKey::asset_dir(&scope(), "p1", AssetKind::ProfilePhoto).unwrap();
        assert!(photo.as_str().starts_with(&photo_dir));

        let doc = AssetKey::asset(&scope(), "p1", AssetKind::MedicalDocument, 5, "scan.pdf").unwrap();
        assert_eq!(doc.as_str(), "users/demo-user/files/p1/medical_documents/5-scan.pdf");

        let upload = AssetKey::asset(&scope(), "p1", AssetKind::UploadedFile, 7, "/tmp/x-ray.png").unwrap();
        assert_eq!(upload.as_str(), "users/demo-user/files/p1/uploads/7-x-ray.png");
    }

    #[test]
    fn photo_upload_ignores_file_name() {
        let key = AssetKey::asset(&scope(), "p1", AssetKind::ProfilePhoto, 9, "me.png").unwrap();
        assert_eq!(key, AssetKey::profile_photo(&scope(), "p1").unwrap());
    }

    #[test]
    fn medication_blob_key() {
        let key = AssetKey::medication_blob("u1", 42).unwrap();
        assert_eq!(key.as_str(), "medication-timetable/u1/42_medication.json");
        assert!(is_medication_blob(key.as_str()));
        assert!(!is_record_blob(key.as_str()));
    }

    #[test]
    fn blob_timestamp_rejects_non_numeric_names() {
        assert_eq!(blob_timestamp("notes.txt"), None);
        assert_eq!(blob_timestamp("a_data.json"), None);
    }

    #[test]
    fn should_convert_asset_kind_from_str() {
        assert_eq!("profile-photo".parse::<AssetKind>().unwrap(), AssetKind::ProfilePhoto);
        assert_eq!("Medical-Documents".parse::<AssetKind>().unwrap(), AssetKind::MedicalDocument);
        assert!("video".parse::<AssetKind>().is_err());
    }
}
