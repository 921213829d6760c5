// server/src/cli/handlers_medication.rs
use anyhow::Result;
use medwallet::{MedWallet, MedicationCommand};
use models::SessionContext;
use serde_json::{json, Value};

pub async fn handle_medication_command(
    wallet: &MedWallet,
    session: &SessionContext,
    action: MedicationCommand,
) -> Result<Value> {
    match &action {
        MedicationCommand::List => {
            let medications = wallet.medications.list(session).await?;
            Ok(json!({ "count": medications.len(), "medications": medications }))
        }
        MedicationCommand::Add { .. } => {
            let draft = action.draft().unwrap_or_default();
            let medication = wallet.medications.add(session, draft).await?;
            Ok(json!(medication))
        }
        MedicationCommand::Remove { id } => {
            let removed = wallet.medications.remove(session, id).await?;
            Ok(json!({ "id": id, "removed": removed }))
        }
    }
}
