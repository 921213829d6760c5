// lib/src/lib.rs

pub mod aggregation;
pub mod auth;
pub mod commands;
pub mod config;
pub mod database;
pub mod formatters;
pub mod medication;
pub mod patient_sync;
pub mod record_store;
pub mod storage_engine;

pub use config::StorageEngineType;

pub use models::{
    AssetKey, AssetKind, PatientRecord, RecordError, RecordResult, RecordScope, Role,
    SessionContext,
};

pub use crate::aggregation::{fan_out, fetch_json_blobs, PatientAggregator, PatientFilter};
pub use crate::auth::authenticate;
pub use crate::commands::*;
pub use crate::database::{build_local_store, MedWallet};
pub use crate::formatters::{parse_qr_payload, pdf_file_name, to_pdf, to_qr_payload, PdfTitle, QrPayload};
pub use crate::medication::MedicationTimetable;
pub use crate::patient_sync::{LoadedRecord, PatientSync, RecordSource, SyncOutcome};
pub use crate::record_store::{AssetRef, RecordStore};
