// models/src/medical/patient.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RecordError, RecordResult, ValidationError};
use crate::medical::{ContactInfo, MedicalDocumentRef, MedicalHistory, UploadedFileRef};

fn unknown(kind: &str, value: &str) -> ValidationError {
    ValidationError::UnknownVariant {
        kind: kind.to_string(),
        value: value.to_string(),
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(unknown("gender", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[default]
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == wanted)
            .ok_or_else(|| unknown("blood group", s))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "Single",
            MaritalStatus::Married => "Married",
            MaritalStatus::Divorced => "Divorced",
            MaritalStatus::Widowed => "Widowed",
        }
    }
}

impl FromStr for MaritalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(MaritalStatus::Single),
            "married" => Ok(MaritalStatus::Married),
            "divorced" => Ok(MaritalStatus::Divorced),
            "widowed" => Ok(MaritalStatus::Widowed),
            _ => Err(unknown("marital status", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Gender, BloodGroup, MaritalStatus);

/// One patient's profile as edited in the wallet.
///
/// The canonical JSON form is camelCase. Admin snapshots written in
/// snake_case are accepted on read, and absent fields take the default
/// record's values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientRecord {
    pub id: String,
    #[serde(alias = "full_name")]
    pub full_name: String,
    #[serde(alias = "date_of_birth")]
    pub date_of_birth: String,
    pub gender: Gender,
    #[serde(alias = "blood_group")]
    pub blood_group: BloodGroup,
    #[serde(alias = "marital_status")]
    pub marital_status: MaritalStatus,
    #[serde(alias = "national_id")]
    pub national_id: String,
    #[serde(alias = "profile_photo")]
    pub profile_photo: String,
    #[serde(alias = "contact_info")]
    pub contact_info: ContactInfo,
    #[serde(alias = "medical_history")]
    pub medical_history: MedicalHistory,
    #[serde(alias = "uploaded_files")]
    pub uploaded_files: Vec<UploadedFileRef>,
    #[serde(alias = "medical_documents")]
    pub medical_documents: Vec<MedicalDocumentRef>,
    #[serde(rename = "created_at", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updated_at", alias = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PatientRecord {
    fn default() -> Self {
        PatientRecord {
            id: String::new(),
            full_name: String::new(),
            date_of_birth: String::new(),
            gender: Gender::default(),
            blood_group: BloodGroup::default(),
            marital_status: MaritalStatus::default(),
            national_id: String::new(),
            profile_photo: String::new(),
            contact_info: ContactInfo::default(),
            medical_history: MedicalHistory::default(),
            uploaded_files: Vec::new(),
            medical_documents: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl PatientRecord {
    /// The record shape used when nothing is stored yet for `id`.
    pub fn default_for(id: impl Into<String>) -> Self {
        PatientRecord {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Parses a stored blob. `key` only labels the error.
    pub fn from_json(key: &str, bytes: &[u8]) -> RecordResult<Self> {
        let record: PatientRecord =
            serde_json::from_slice(bytes).map_err(|e| RecordError::parse(key, e))?;
        Ok(record.normalized())
    }

    pub fn from_value(key: &str, value: Value) -> RecordResult<Self> {
        let record: PatientRecord =
            serde_json::from_value(value).map_err(|e| RecordError::parse(key, e))?;
        Ok(record.normalized())
    }

    pub fn to_json(&self) -> RecordResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Moves documents stored under the medical history onto the record,
    /// skipping any already present by URL.
    fn normalized(mut self) -> Self {
        for doc in self.medical_history.take_nested_documents() {
            if !self.medical_documents.iter().any(|d| d.url == doc.url) {
                self.medical_documents.push(doc);
            }
        }
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_record_has_documented_shape() {
        let record = PatientRecord::default_for("demo-user");
        assert_eq!(record.id, "demo-user");
        assert_eq!(record.full_name, "");
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.blood_group, BloodGroup::APositive);
        assert_eq!(record.marital_status, MaritalStatus::Single);
        assert!(record.medical_history.allergies.is_empty());
        assert!(!record.medical_history.smoking.status);
        assert_eq!(record.medical_history.alcohol.frequency, "");
        assert!(record.uploaded_files.is_empty());
    }

    #[test]
    fn parses_editor_form() {
        let blob = json!({
            "id": "p1",
            "fullName": "Ada Lovelace",
            "gender": "Female",
            "bloodGroup": "AB-",
            "maritalStatus": "Married",
            "contactInfo": { "phoneNumber": "555", "emergencyContact": { "name": "Bob" } },
            "medicalHistory": {
                "allergies": ["penicillin"],
                "smoking": { "status": true, "frequency": "daily" },
                "medicalDocuments": [{ "title": "scan", "url": "https://x/scan" }]
            },
            "created_at": "2024-03-01T10:00:00.000Z"
        });
        let record = PatientRecord::from_json("p1_data.json", blob.to_string().as_bytes()).unwrap();
        assert_eq!(record.full_name, "Ada Lovelace");
        assert_eq!(record.blood_group, BloodGroup::AbNegative);
        assert_eq!(record.contact_info.phone_number, "555");
        assert_eq!(record.contact_info.emergency_contact.name, "Bob");
        assert!(record.medical_history.smoking.status);
        assert_eq!(record.medical_documents.len(), 1);
        assert_eq!(record.medical_documents[0].title, "scan");
    }

    #[test]
    fn parses_admin_snapshot_form() {
        let blob = json!({
            "id": "p2",
            "full_name": "Alan Turing",
            "date_of_birth": "1912-06-23",
            "blood_group": "O+",
            "marital_status": "Single",
            "national_id": "N-1",
            "contact_info": {
                "phone_number": "123",
                "address": { "street": "1 Main", "city": "Wilmslow", "state": "CH", "zip": "SK9" },
                "emergency_contact": { "name": "Ethel", "phone": "9", "relationship": "mother" }
            },
            "medical_history": {
                "past_illnesses": ["flu"],
                "chronic_diseases": [],
                "family_medical_history": "none",
                "genetic_conditions": ["g"],
                "medical_documents": []
            },
            "uploaded_files": [],
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-02T10:00:00Z"
        });
        let record = PatientRecord::from_value("p2_data.json", blob).unwrap();
        assert_eq!(record.full_name, "Alan Turing");
        assert_eq!(record.national_id, "N-1");
        assert_eq!(record.contact_info.address.city, "Wilmslow");
        assert_eq!(record.contact_info.emergency_contact.relationship, "mother");
        assert_eq!(record.medical_history.past_illnesses, vec!["flu".to_string()]);
        assert_eq!(record.medical_history.family_medical_history, "none");
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn malformed_blob_is_a_parse_error() {
        let err = PatientRecord::from_json("bad_data.json", b"{ not json").unwrap_err();
        assert!(matches!(err, RecordError::ParseError { ref key, .. } if key == "bad_data.json"));
    }

    #[test]
    fn canonical_form_does_not_duplicate_documents() {
        let mut record = PatientRecord::default_for("p3");
        record.medical_documents.push(MedicalDocumentRef {
            title: "t".into(),
            url: "u".into(),
            content_type: None,
            uploaded_at: None,
        });
        let bytes = record.to_json().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["medicalHistory"].get("medicalDocuments").is_none());
        assert_eq!(value["medicalDocuments"].as_array().map(|a| a.len()), Some(1));
        let back = PatientRecord::from_json("p3", &bytes).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("ab+".parse::<BloodGroup>().unwrap(), BloodGroup::AbPositive);
        assert_eq!("WIDOWED".parse::<MaritalStatus>().unwrap(), MaritalStatus::Widowed);
        assert!("X".parse::<BloodGroup>().is_err());
        assert_eq!(BloodGroup::ONegative.to_string(), "O-");
    }
}
