// server/src/cli/cli.rs

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::debug;
use medwallet::config::{load_config, save_config};
use medwallet::{CliArgs, Commands, MedWallet};
use serde_json::{json, Value};

use crate::cli::handlers_admin::{handle_patients_command, handle_remove_command};
use crate::cli::handlers_export::{handle_pdf_command, handle_qr_command};
use crate::cli::handlers_medication::handle_medication_command;
use crate::cli::handlers_patient::{
    handle_edit_command, handle_save_command, handle_show_command, handle_upload_command,
};
use crate::cli::handlers_user::{handle_login_command, handle_logout_command, handle_whoami_command};

pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();
    let output = run(args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Loads the configuration, wires the wallet and runs one command.
pub async fn run(args: CliArgs) -> Result<Value> {
    let config_path = args.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = load_config(config_path.as_deref())?;

    if args.command == Commands::InitConfig {
        save_config(&config, config_path.as_deref())?;
        return Ok(json!({ "saved": true, "path": config_path, "config": config }));
    }

    let wallet = MedWallet::new(config).context("Failed to initialise storage")?;
    dispatch(&wallet, args.command).await
}

pub async fn dispatch(wallet: &MedWallet, command: Commands) -> Result<Value> {
    let session = wallet.cache.load_session().await;
    debug!("Running {:?} as {:?}", command, session.role());

    match command {
        Commands::Login { role, email, password } => {
            handle_login_command(wallet, role, &email, &password).await
        }
        Commands::Logout => handle_logout_command(wallet, session).await,
        Commands::Whoami => handle_whoami_command(&session),
        Commands::Show { cached } => handle_show_command(wallet, &session, cached).await,
        Commands::Edit(edit) => handle_edit_command(wallet, &session, edit).await,
        Commands::Save => handle_save_command(wallet, &session).await,
        Commands::Upload { kind, file, content_type } => {
            handle_upload_command(wallet, &session, kind, &file, content_type).await
        }
        Commands::Patients(args) => handle_patients_command(wallet, &session, &args).await,
        Commands::Remove { id, scope } => {
            handle_remove_command(wallet, &session, &id, scope.as_deref()).await
        }
        Commands::Qr(target) => handle_qr_command(wallet, &session, &target).await,
        Commands::Pdf { target, out } => handle_pdf_command(wallet, &session, &target, out).await,
        Commands::Medication(action) => handle_medication_command(wallet, &session, action).await,
        // Needs the --config path, so `run` handles it before storage is opened.
        Commands::InitConfig => bail!("init-config must be run through `run`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medwallet::config::{CacheEngineType, MedWalletConfig};
    use medwallet::{EditArgs, PatientsArgs};
    use models::Role;

    fn wallet() -> MedWallet {
        let mut config = MedWalletConfig::default();
        config.cache.engine = CacheEngineType::Memory;
        MedWallet::new(config).unwrap()
    }

    fn login(role: Role) -> Commands {
        let email = format!("{}@example.com", role);
        Commands::Login { role, email, password: "password123".to_string() }
    }

    #[tokio::test]
    async fn user_edits_then_admin_sees_the_patient() {
        let wallet = wallet();
        dispatch(&wallet, login(Role::User)).await.unwrap();

        let edit = EditArgs { full_name: Some("Ines Moreau".to_string()), ..Default::default() };
        let edited = dispatch(&wallet, Commands::Edit(edit)).await.unwrap();
        assert_eq!(edited["record"]["fullName"], "Ines Moreau");
        assert_eq!(edited["synced"], true);

        let denied = dispatch(&wallet, Commands::Patients(PatientsArgs::default())).await;
        assert!(denied.is_err());

        dispatch(&wallet, login(Role::Admin)).await.unwrap();
        let listed = dispatch(&wallet, Commands::Patients(PatientsArgs::default())).await.unwrap();
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["patients"][0]["fullName"], "Ines Moreau");
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let wallet = wallet();
        dispatch(&wallet, login(Role::Doctor)).await.unwrap();
        let who = dispatch(&wallet, Commands::Whoami).await.unwrap();
        assert_eq!(who["userRole"], "doctor");

        dispatch(&wallet, Commands::Logout).await.unwrap();
        let who = dispatch(&wallet, Commands::Whoami).await.unwrap();
        assert_eq!(who["isAuthenticated"], false);
    }

    #[tokio::test]
    async fn init_config_writes_to_the_given_path() {
        let dir = std::env::temp_dir().join(format!("medwallet-init-{}", std::process::id()));
        let path = dir.join("medwallet.yaml");
        let args = CliArgs { config: Some(path.clone()), command: Commands::InitConfig };

        let output = run(args).await.unwrap();
        assert_eq!(output["saved"], true);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn init_config_is_not_dispatched_against_a_wallet() {
        let wallet = wallet();
        assert!(dispatch(&wallet, Commands::InitConfig).await.is_err());
    }

    #[tokio::test]
    async fn bad_password_is_an_error() {
        let wallet = wallet();
        let result = dispatch(
            &wallet,
            Commands::Login {
                role: Role::User,
                email: "user@example.com".to_string(),
                password: "wrong".to_string(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
