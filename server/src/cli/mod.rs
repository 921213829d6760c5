// server/src/cli/mod.rs

// Command-line front end: argument parsing lives in `medwallet::commands`,
// each handler module serves one group of commands.

pub mod cli;
pub mod handlers_admin;
pub mod handlers_export;
pub mod handlers_medication;
pub mod handlers_patient;
pub mod handlers_user;
pub mod handlers_utils;

pub use cli::{dispatch, run, start_cli};
pub use medwallet::commands::{CliArgs, Commands, EditArgs, ExportArgs, MedicationCommand, PatientsArgs};
