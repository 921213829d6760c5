// models/src/medical/medication.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a user's medication timetable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub schedule: Vec<String>,
    #[serde(default, alias = "next_refill")]
    pub next_refill: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(rename = "created_at", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updated_at", alias = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields the user fills in before a medication is stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub schedule: Vec<String>,
    pub next_refill: String,
}

impl Medication {
    pub fn from_draft(draft: MedicationDraft, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Medication {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            dosage: draft.dosage,
            frequency: draft.frequency,
            // Blank schedule rows come from empty form inputs.
            schedule: draft.schedule.into_iter().filter(|s| !s.trim().is_empty()).collect(),
            next_refill: draft.next_refill,
            user_id: user_id.into(),
            created_at: now,
            updated_at: Some(now),
        }
    }
}
