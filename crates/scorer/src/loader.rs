use std::io::Read;
use std::path::Path;

use common::error::{PipelineError, Result};
use common::types::{TransactionRecord, TransactionTable};
use serde_json::Value;

/// Read a JSON array of transaction objects from `path`.
pub fn load_transactions(path: &Path) -> Result<TransactionTable> {
    if !path.is_file() {
        return Err(PipelineError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let table = load_from_reader(std::io::BufReader::new(file))?;

    tracing::info!(
        path = %path.display(),
        records = table.len(),
        columns = ?table.columns().collect::<Vec<_>>(),
        "transactions loaded"
    );
    Ok(table)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<TransactionTable> {
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| PipelineError::MalformedInput(e.to_string()))?;
    table_from_value(value)
}

#[cfg(test)]
pub fn parse_transactions(bytes: &[u8]) -> Result<TransactionTable> {
    load_from_reader(bytes)
}

fn table_from_value(value: Value) -> Result<TransactionTable> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(PipelineError::MalformedInput(format!(
                "expected a JSON array of objects, got {}",
                json_type_name(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(fields) => records.push(TransactionRecord::new(fields)),
            other => {
                return Err(PipelineError::MalformedInput(format!(
                    "element {idx} is {}, expected an object",
                    json_type_name(&other)
                )))
            }
        }
    }

    metrics::counter!("scorer_records_loaded_total").increment(records.len() as u64);
    Ok(TransactionTable::new(records))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_preserves_every_field() {
        let raw = br#"[
            {"userWallet": "0xa", "action": "deposit", "amount": 5, "network": "polygon"},
            {"userWallet": "0xb", "action": "borrow", "actionData": {"assetSymbol": "USDC"}}
        ]"#;
        let table = parse_transactions(raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records()[0].get("network").and_then(Value::as_str),
            Some("polygon")
        );
        assert!(table.records()[1].get("actionData").is_some());
        assert!(table.has_column("actionData"));
    }

    #[test]
    fn test_empty_array_is_an_empty_table() {
        let table = parse_transactions(b"[]").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_syntax_error_is_malformed_input() {
        let err = parse_transactions(b"[{\"userWallet\": ").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_top_level_object_is_malformed_input() {
        let err = parse_transactions(br#"{"userWallet": "0xa"}"#).unwrap_err();
        match err {
            PipelineError::MalformedInput(msg) => assert!(msg.contains("an object")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_element_names_index() {
        let err = parse_transactions(br#"[{"userWallet": "0xa"}, 7]"#).unwrap_err();
        match err {
            PipelineError::MalformedInput(msg) => assert!(msg.contains("element 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_transactions(&missing).unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
    }

    #[test]
    fn test_directory_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_transactions(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"[{{"userWallet": "0xa", "action": "repay"}}, {{"userWallet": "0xa", "action": "deposit"}}]"#
        )
        .unwrap();
        let table = load_transactions(tmp.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.has_column("amount"));
    }
}
