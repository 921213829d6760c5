// server/src/cli/handlers_admin.rs
use anyhow::Result;
use log::info;
use medwallet::{MedWallet, PatientsArgs};
use models::{Role, SessionContext};
use serde_json::{json, Value};

pub async fn handle_patients_command(
    wallet: &MedWallet,
    session: &SessionContext,
    args: &PatientsArgs,
) -> Result<Value> {
    let scope = wallet.scope(args.scope.as_deref())?;
    let patients = wallet.aggregator.load_patients(session, &scope).await?;
    let total = patients.len();
    let patients = args.filter().apply(patients);
    info!("{} of {} patients match", patients.len(), total);
    Ok(json!({
        "scope": scope.as_str(),
        "count": patients.len(),
        "patients": patients,
    }))
}

pub async fn handle_remove_command(
    wallet: &MedWallet,
    session: &SessionContext,
    id: &str,
    scope: Option<&str>,
) -> Result<Value> {
    session.require_role(Role::Admin)?;
    let scope = wallet.scope(scope)?;
    let removed = wallet.store.remove_record(&scope, id).await?;
    Ok(json!({ "id": id, "scope": scope.as_str(), "removedObjects": removed }))
}
