// server/src/cli/handlers_export.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use medwallet::formatters::{pdf_file_name, to_pdf, to_qr_payload, PdfTitle};
use medwallet::{ExportArgs, MedWallet};
use models::{PatientRecord, RecordError, SessionContext};
use serde_json::{json, Value};

/// The record an export is built from: the caller's own record, or with
/// `--id` a patient from the aggregated list.
async fn export_target(
    wallet: &MedWallet,
    session: &SessionContext,
    target: &ExportArgs,
) -> Result<(PatientRecord, PdfTitle)> {
    match &target.id {
        None => {
            let loaded = wallet.sync.load(session).await?;
            Ok((loaded.record, PdfTitle::MedicalWallet))
        }
        Some(id) => {
            let scope = wallet.scope(target.scope.as_deref())?;
            let record = wallet
                .aggregator
                .load_patients(session, &scope)
                .await?
                .into_iter()
                .find(|patient| &patient.id == id)
                .ok_or_else(|| RecordError::NotFound(id.clone()))?;
            Ok((record, PdfTitle::PatientMedicalRecord))
        }
    }
}

pub async fn handle_qr_command(wallet: &MedWallet, session: &SessionContext, target: &ExportArgs) -> Result<Value> {
    let (record, _) = export_target(wallet, session, target).await?;
    let payload = to_qr_payload(&record)?;
    Ok(json!({ "id": record.id, "payload": payload }))
}

pub async fn handle_pdf_command(
    wallet: &MedWallet,
    session: &SessionContext,
    target: &ExportArgs,
    out: Option<PathBuf>,
) -> Result<Value> {
    let (record, title) = export_target(wallet, session, target).await?;
    let bytes = to_pdf(&record, title)?;
    let path = out.unwrap_or_else(|| PathBuf::from(pdf_file_name(&record)));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(json!({ "id": record.id, "path": path, "bytes": bytes.len() }))
}
