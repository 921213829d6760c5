// models/src/medical/medical_history.rs
use serde::{Deserialize, Serialize};

use crate::medical::MedicalDocumentRef;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surgery {
    pub name: String,
    pub date: String,
}

/// Smoking or alcohol use.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Habit {
    pub status: bool,
    pub frequency: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalHistory {
    #[serde(alias = "past_illnesses")]
    pub past_illnesses: Vec<String>,
    pub surgeries: Vec<Surgery>,
    pub allergies: Vec<String>,
    #[serde(alias = "chronic_diseases")]
    pub chronic_diseases: Vec<String>,
    #[serde(alias = "family_medical_history")]
    pub family_medical_history: String,
    pub smoking: Habit,
    pub alcohol: Habit,
    pub disabilities: Vec<String>,
    #[serde(alias = "genetic_conditions")]
    pub genetic_conditions: Vec<String>,
    // Editor snapshots keep documents here; parsing moves them onto the record.
    #[serde(rename = "medicalDocuments", alias = "medical_documents", skip_serializing)]
    pub(crate) nested_documents: Vec<MedicalDocumentRef>,
}

impl MedicalHistory {
    pub(crate) fn take_nested_documents(&mut self) -> Vec<MedicalDocumentRef> {
        std::mem::take(&mut self.nested_documents)
    }
}
