use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::StoreError,
    runtime::{
        commands::InsertCommand,
        scripts::CHANGELOG_INSERT_SCRIPT,
    },
};

/// Run the atomic insert script and map its error codes.
pub async fn execute_insert<C>(conn: &mut C, collection: &str, command: &InsertCommand) -> Result<(), StoreError>
where
    C: ConnectionLike + Send,
{
    let payload = serde_json::to_string(command)?;

    let mut invocation = CHANGELOG_INSERT_SCRIPT.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await?;

    let value: Value = serde_json::from_str(&raw)?;
    interpret_response(collection, &value)
}

fn interpret_response(collection: &str, value: &Value) -> Result<(), StoreError> {
    match value.get("error") {
        None => Ok(()),
        Some(Value::String(code)) if code == "duplicate_key" => {
            let field = value.get("field").and_then(|v| v.as_str()).unwrap_or_default();
            let existing = value.get("value").and_then(|v| v.as_str()).unwrap_or_default();
            Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                field: field.to_string(),
                value: existing.to_string(),
            })
        }
        Some(Value::String(code)) => Err(StoreError::Script(code.clone())),
        Some(_) => Err(StoreError::Script("lua_error".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_response() {
        assert!(interpret_response("c", &json!({"ok": true, "document_id": "x"})).is_ok());
    }

    #[test]
    fn duplicate_key_response() {
        let err = interpret_response(
            "databasechangelog",
            &json!({"error": "duplicate_key", "field": "name", "value": "initDB", "existing_document_id": "x"}),
        )
        .unwrap_err();
        match err {
            StoreError::DuplicateKey { collection, field, value } => {
                assert_eq!(collection, "databasechangelog");
                assert_eq!(field, "name");
                assert_eq!(value, "initDB");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_error_codes() {
        let err = interpret_response("c", &json!({"error": "document_exists"})).unwrap_err();
        assert!(matches!(err, StoreError::Script(code) if code == "document_exists"));
        let err = interpret_response("c", &json!({"error": 42})).unwrap_err();
        assert!(matches!(err, StoreError::Script(code) if code == "lua_error"));
    }
}
