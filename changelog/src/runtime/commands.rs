use serde::Serialize;

use crate::{errors::StoreError, keys::KeyContext, store::ChangelogEntry};

/// Payload for the atomic changelog insert script.
#[derive(Debug, Serialize)]
pub struct InsertCommand {
    pub document_key: String,
    pub document_id: String,
    pub document_json: String,
    pub guards: Vec<UniqueGuard>,
}

/// A unique index guard the script must claim before writing the document.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueGuard {
    pub key: String,
    pub field: String,
    pub value: String,
}

/// Build the insert payload for `entry`, guarding every unique field.
pub fn build_insert_command(
    keys: &KeyContext<'_>,
    document_id: &str,
    entry: &ChangelogEntry,
    unique_fields: &[String],
) -> Result<InsertCommand, StoreError> {
    let document_json = serde_json::to_string(entry)?;

    let guards = unique_fields
        .iter()
        .filter_map(|field| {
            entry.field_value(field).map(|value| UniqueGuard {
                key: keys.unique_guard(field, &value),
                field: field.clone(),
                value,
            })
        })
        .collect();

    Ok(InsertCommand {
        document_key: keys.document(document_id),
        document_id: document_id.to_string(),
        document_json,
        guards,
    })
}
