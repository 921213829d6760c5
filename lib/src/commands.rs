// lib/src/commands.rs

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use models::{
    AssetKind, BloodGroup, Gender, MaritalStatus, MedicationDraft, PatientRecord, Role,
};

use crate::aggregation::PatientFilter;

#[derive(Parser, Debug, PartialEq, Clone)]
#[clap(name = "medwallet", version, about = "Personal medical wallet and patient records")]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Clone)]
pub enum Commands {
    /// Sign in with one of the configured accounts
    Login {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Print the saved session
    Whoami,
    /// Show your own record
    Show {
        /// Print the local copy without contacting the backend
        #[arg(long)]
        cached: bool,
    },
    /// Change fields of your own record
    Edit(EditArgs),
    /// Store a snapshot of your record
    Save,
    /// Upload a photo, file or medical document
    Upload {
        #[arg(long, default_value = "uploaded-file")]
        kind: AssetKind,
        #[arg(long)]
        file: PathBuf,
        /// MIME type; guessed from the file extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List patients (doctors and admins)
    Patients(PatientsArgs),
    /// Delete a patient and its files (admins)
    Remove {
        id: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Print the emergency QR payload
    Qr(ExportArgs),
    /// Export a record as PDF
    Pdf {
        #[clap(flatten)]
        target: ExportArgs,
        /// Output file; defaults to `{full name}-medical-record.pdf`
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Manage your medication timetable
    #[clap(subcommand)]
    Medication(MedicationCommand),
    /// Write the effective configuration to the config path
    InitConfig,
}

/// Selects whose record an export is built from. Without `--id` the signed
/// in user's own record is used.
#[derive(Args, Debug, PartialEq, Clone, Default)]
pub struct ExportArgs {
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(Args, Debug, PartialEq, Clone, Default)]
pub struct PatientsArgs {
    /// Storage scope to aggregate; defaults to the configured one
    #[arg(long)]
    pub scope: Option<String>,
    /// Case-insensitive match on the full name
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub gender: Option<Gender>,
    #[arg(long)]
    pub blood_group: Option<BloodGroup>,
    #[arg(long)]
    pub marital_status: Option<MaritalStatus>,
}

impl PatientsArgs {
    pub fn filter(&self) -> PatientFilter {
        PatientFilter {
            search: self.search.clone(),
            gender: self.gender,
            blood_group: self.blood_group,
            marital_status: self.marital_status,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Clone)]
pub enum MedicationCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        dosage: String,
        #[arg(long, default_value = "")]
        frequency: String,
        /// Time of day to take it; repeat for several
        #[arg(long = "at")]
        schedule: Vec<String>,
        #[arg(long, default_value = "")]
        next_refill: String,
    },
    Remove {
        id: String,
    },
}

impl MedicationCommand {
    /// The draft described by an `add` command.
    pub fn draft(&self) -> Option<MedicationDraft> {
        match self {
            MedicationCommand::Add { name, dosage, frequency, schedule, next_refill } => {
                Some(MedicationDraft {
                    name: name.clone(),
                    dosage: dosage.clone(),
                    frequency: frequency.clone(),
                    schedule: schedule.clone(),
                    next_refill: next_refill.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Field edits for `medwallet edit`. List flags replace the whole list.
#[derive(Args, Debug, PartialEq, Clone, Default)]
pub struct EditArgs {
    #[arg(long)]
    pub full_name: Option<String>,
    #[arg(long)]
    pub date_of_birth: Option<String>,
    #[arg(long)]
    pub gender: Option<Gender>,
    #[arg(long)]
    pub blood_group: Option<BloodGroup>,
    #[arg(long)]
    pub marital_status: Option<MaritalStatus>,
    #[arg(long)]
    pub national_id: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip: Option<String>,
    #[arg(long)]
    pub emergency_name: Option<String>,
    #[arg(long)]
    pub emergency_phone: Option<String>,
    #[arg(long)]
    pub emergency_relationship: Option<String>,
    #[arg(long = "illness")]
    pub past_illnesses: Option<Vec<String>>,
    #[arg(long = "allergy")]
    pub allergies: Option<Vec<String>>,
    #[arg(long = "chronic-disease")]
    pub chronic_diseases: Option<Vec<String>>,
    #[arg(long = "disability")]
    pub disabilities: Option<Vec<String>>,
    #[arg(long = "genetic-condition")]
    pub genetic_conditions: Option<Vec<String>>,
    #[arg(long)]
    pub family_history: Option<String>,
    #[arg(long)]
    pub smoking: Option<bool>,
    #[arg(long)]
    pub smoking_frequency: Option<String>,
    #[arg(long)]
    pub alcohol: Option<bool>,
    #[arg(long)]
    pub alcohol_frequency: Option<String>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl EditArgs {
    pub fn is_empty(&self) -> bool {
        *self == EditArgs::default()
    }

    pub fn apply(self, record: &mut PatientRecord) {
        set(&mut record.full_name, self.full_name);
        set(&mut record.date_of_birth, self.date_of_birth);
        set(&mut record.gender, self.gender);
        set(&mut record.blood_group, self.blood_group);
        set(&mut record.marital_status, self.marital_status);
        set(&mut record.national_id, self.national_id);

        let contact = &mut record.contact_info;
        set(&mut contact.phone_number, self.phone);
        set(&mut contact.email, self.email);
        set(&mut contact.address.street, self.street);
        set(&mut contact.address.city, self.city);
        set(&mut contact.address.state, self.state);
        set(&mut contact.address.zip, self.zip);
        set(&mut contact.emergency_contact.name, self.emergency_name);
        set(&mut contact.emergency_contact.phone, self.emergency_phone);
        set(&mut contact.emergency_contact.relationship, self.emergency_relationship);

        let history = &mut record.medical_history;
        set(&mut history.past_illnesses, self.past_illnesses);
        set(&mut history.allergies, self.allergies);
        set(&mut history.chronic_diseases, self.chronic_diseases);
        set(&mut history.disabilities, self.disabilities);
        set(&mut history.genetic_conditions, self.genetic_conditions);
        set(&mut history.family_medical_history, self.family_history);
        set(&mut history.smoking.status, self.smoking);
        set(&mut history.smoking.frequency, self.smoking_frequency);
        set(&mut history.alcohol.status, self.alcohol);
        set(&mut history.alcohol.frequency, self.alcohol_frequency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filters_for_patient_listing() {
        let args = CliArgs::try_parse_from([
            "medwallet",
            "patients",
            "--search",
            "ann",
            "--blood-group",
            "O-",
            "--gender",
            "female",
        ])
        .unwrap();
        let Commands::Patients(patients) = args.command else {
            panic!("expected patients command");
        };
        let filter = patients.filter();
        assert_eq!(filter.blood_group, Some(BloodGroup::ONegative));
        assert_eq!(filter.gender, Some(Gender::Female));
        assert_eq!(filter.search.as_deref(), Some("ann"));
    }

    #[test]
    fn global_config_flag_is_accepted_after_subcommand() {
        let args = CliArgs::try_parse_from(["medwallet", "whoami", "--config", "/tmp/m.yaml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/m.yaml")));
    }

    #[test]
    fn login_requires_known_role() {
        assert!(CliArgs::try_parse_from([
            "medwallet", "login", "--role", "nurse", "--email", "a", "--password", "b"
        ])
        .is_err());
    }

    #[test]
    fn edit_touches_only_given_fields() {
        let args = CliArgs::try_parse_from([
            "medwallet",
            "edit",
            "--full-name",
            "Lee Chen",
            "--allergy",
            "dust",
            "--allergy",
            "pollen",
            "--smoking",
            "true",
        ])
        .unwrap();
        let Commands::Edit(edit) = args.command else {
            panic!("expected edit command");
        };
        let mut record = PatientRecord::default_for("demo-user");
        record.national_id = "keep".to_string();
        edit.apply(&mut record);

        assert_eq!(record.full_name, "Lee Chen");
        assert_eq!(record.medical_history.allergies, vec!["dust", "pollen"]);
        assert!(record.medical_history.smoking.status);
        assert_eq!(record.national_id, "keep");
    }

    #[test]
    fn medication_add_builds_draft() {
        let args = CliArgs::try_parse_from([
            "medwallet", "medication", "add", "--name", "Aspirin", "--at", "08:00", "--at", "20:00",
        ])
        .unwrap();
        let Commands::Medication(command) = args.command else {
            panic!("expected medication command");
        };
        let draft = command.draft().unwrap();
        assert_eq!(draft.name, "Aspirin");
        assert_eq!(draft.schedule, vec!["08:00", "20:00"]);
    }
}
