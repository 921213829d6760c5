// lib/src/formatters/qr_payload.rs
use models::errors::{RecordError, RecordResult};
use models::{BloodGroup, ContactInfo, Gender, MaritalStatus, MedicalHistory, PatientRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub blood_group: BloodGroup,
    pub marital_status: MaritalStatus,
    pub national_id: String,
    pub profile_photo: String,
}

/// What an emergency responder gets from scanning the patient's QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub basic_info: BasicInfo,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub medical_history: MedicalHistory,
}

impl From<&PatientRecord> for QrPayload {
    fn from(record: &PatientRecord) -> Self {
        QrPayload {
            basic_info: BasicInfo {
                full_name: record.full_name.clone(),
                date_of_birth: record.date_of_birth.clone(),
                gender: record.gender,
                blood_group: record.blood_group,
                marital_status: record.marital_status,
                national_id: record.national_id.clone(),
                profile_photo: record.profile_photo.clone(),
            },
            contact_info: record.contact_info.clone(),
            medical_history: record.medical_history.clone(),
        }
    }
}

pub fn to_qr_payload(record: &PatientRecord) -> RecordResult<String> {
    serde_json::to_string(&QrPayload::from(record))
        .map_err(|e| RecordError::SerializationError(e.to_string()))
}

pub fn parse_qr_payload(payload: &str) -> RecordResult<QrPayload> {
    serde_json::from_str(payload).map_err(|e| RecordError::parse("qr payload", e))
}
