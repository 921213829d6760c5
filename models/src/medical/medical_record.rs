// models/src/medical/medical_record.rs
//! References to assets stored next to a patient record. They have no
//! lifecycle of their own; the owning record carries them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileRef {
    pub name: String,
    pub url: String,
    /// MIME type or upload kind tag.
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    #[serde(alias = "uploaded_at", default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDocumentRef {
    pub title: String,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(alias = "uploaded_at", default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}
