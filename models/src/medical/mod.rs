// models/src/medical/mod.rs
pub mod address;
pub mod medical_history;
pub mod medical_record;
pub mod medication;
pub mod patient;

pub use address::{Address, ContactInfo, EmergencyContact};
pub use medical_history::{Habit, MedicalHistory, Surgery};
pub use medical_record::{MedicalDocumentRef, UploadedFileRef};
pub use medication::{Medication, MedicationDraft};
pub use patient::{BloodGroup, Gender, MaritalStatus, PatientRecord};
