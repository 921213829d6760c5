// server/src/cli/handlers_patient.rs
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use medwallet::{EditArgs, MedWallet};
use models::{AssetKind, SessionContext};
use serde_json::{json, Value};

use crate::cli::handlers_utils::guess_content_type;

pub async fn handle_show_command(wallet: &MedWallet, session: &SessionContext, cached: bool) -> Result<Value> {
    if cached {
        let record = wallet.sync.cached(session).await?;
        return Ok(json!({ "record": record, "source": "cache" }));
    }
    let loaded = wallet.sync.load(session).await?;
    Ok(json!(loaded))
}

pub async fn handle_edit_command(wallet: &MedWallet, session: &SessionContext, edit: EditArgs) -> Result<Value> {
    if edit.is_empty() {
        return Err(anyhow!("Nothing to change; pass at least one field flag"));
    }
    let outcome = wallet.sync.update(session, |record| edit.apply(record)).await?;
    Ok(json!(outcome))
}

pub async fn handle_save_command(wallet: &MedWallet, session: &SessionContext) -> Result<Value> {
    let record = match wallet.sync.cached(session).await? {
        Some(record) => record,
        None => wallet.sync.load(session).await?.record,
    };
    let key = wallet.sync.save_snapshot(session, &record).await?;
    Ok(json!({ "saved": true, "key": key, "record": record }))
}

pub async fn handle_upload_command(
    wallet: &MedWallet,
    session: &SessionContext,
    kind: AssetKind,
    file: &Path,
    content_type: Option<String>,
) -> Result<Value> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", file.display()))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(file).to_string());

    let outcome = wallet
        .sync
        .upload_file(session, kind, &file_name, bytes, &content_type)
        .await?;
    Ok(json!(outcome))
}
