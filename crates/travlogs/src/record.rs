//! Reading the compilation log and normalizing its records.
//!
//! The log is a JSON array. Each element describes one production step:
//!
//! ```json
//! {"inputs": ["a.c"], "output": "a.o", "rule": "cc", "headers": ["a.h"]}
//! ```
//!
//! `inputs`, `output` and `rule` are mandatory. `headers` is optional and is
//! folded into the inputs when the graph is built. Any other field is
//! ignored.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Canonical form of one log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Files consumed by this step, in log order. Duplicates are kept.
    pub inputs: Vec<String>,
    /// The single file produced.
    pub output: String,
    /// Opaque rule label (`cc`, `link`, ...).
    pub rule: String,
    /// Discovered headers, treated as extra inputs.
    pub headers: Vec<String>,
}

/// Read and parse the log at `path` as a top-level JSON array.
///
/// # Errors
///
/// Returns [`Error::LogRead`] if the file is missing or unreadable, is not
/// valid JSON, or its top-level value is not an array.
pub fn read_log(path: &Path) -> Result<Vec<Value>> {
    let bytes = fs::read(path).map_err(|e| Error::LogRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_log(path, &bytes)
}

/// Parse already-loaded log bytes. `path` is only used for error reporting.
///
/// # Errors
///
/// Same as [`read_log`], minus the I/O failures.
pub fn parse_log(path: &Path, bytes: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::LogRead {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })?;

    match value {
        Value::Array(records) => Ok(records),
        other => Err(Error::LogRead {
            path: path.to_path_buf(),
            reason: format!("expected a JSON array of records, found {}", kind_of(&other)),
        }),
    }
}

/// Normalize the record at position `index`.
///
/// # Errors
///
/// - [`Error::InvalidField`] if the record is not an object or a known field
///   has the wrong type.
/// - [`Error::MissingField`] if `inputs`, `output` or `rule` is absent.
pub fn normalize_record(index: usize, raw: &Value) -> Result<EdgeRecord> {
    let fields = as_object(index, raw)?;

    let inputs = path_list(index, fields, "inputs")?.ok_or(Error::MissingField {
        record: index,
        field: "inputs",
    })?;
    let output = string_field(index, fields, "output")?;
    let rule = rule_of(index, raw)?.to_string();
    let headers = path_list(index, fields, "headers")?.unwrap_or_default();

    Ok(EdgeRecord {
        inputs,
        output,
        rule,
        headers,
    })
}

/// Extract just the `rule` of a raw record, so filtered-out records need not
/// be fully validated.
///
/// # Errors
///
/// Same conditions as [`normalize_record`], restricted to the `rule` field.
pub fn rule_of(index: usize, raw: &Value) -> Result<&str> {
    let fields = as_object(index, raw)?;
    match present(fields, "rule") {
        None => Err(Error::MissingField {
            record: index,
            field: "rule",
        }),
        Some(Value::String(rule)) => Ok(rule),
        Some(_) => Err(Error::InvalidField {
            record: index,
            field: "rule",
            expected: "a string",
        }),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn as_object(index: usize, raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object().ok_or(Error::InvalidField {
        record: index,
        field: "<record>",
        expected: "a JSON object",
    })
}

/// A field counts as absent when missing or explicitly `null`.
fn present<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    fields.get(field).filter(|value| !value.is_null())
}

fn string_field(index: usize, fields: &Map<String, Value>, field: &'static str) -> Result<String> {
    match present(fields, field) {
        None => Err(Error::MissingField {
            record: index,
            field,
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::InvalidField {
            record: index,
            field,
            expected: "a path string",
        }),
    }
}

fn path_list(
    index: usize,
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<Vec<String>>> {
    let Some(value) = present(fields, field) else {
        return Ok(None);
    };

    let invalid = || Error::InvalidField {
        record: index,
        field,
        expected: "a sequence of path strings",
    };

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
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
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn normalizes_full_record() {
        let raw = json!({
            "inputs": ["a.c", "b.c"],
            "output": "ab.o",
            "rule": "cc",
            "headers": ["a.h"],
            "command": "clang -c a.c b.c",
        });

        let record = normalize_record(0, &raw).unwrap();
        assert_eq!(record.inputs, vec!["a.c", "b.c"]);
        assert_eq!(record.output, "ab.o");
        assert_eq!(record.rule, "cc");
        assert_eq!(record.headers, vec!["a.h"]);
    }

    #[test]
    fn headers_default_to_empty() {
        let raw = json!({"inputs": ["a.o"], "output": "app", "rule": "link"});
        let record = normalize_record(0, &raw).unwrap();
        assert!(record.headers.is_empty());
    }

    #[test]
    fn duplicate_inputs_are_kept() {
        let raw = json!({"inputs": ["a.c", "a.c"], "output": "a.o", "rule": "cc"});
        let record = normalize_record(0, &raw).unwrap();
        assert_eq!(record.inputs.len(), 2);
    }

    #[test]
    fn zero_inputs_are_legal() {
        let raw = json!({"inputs": [], "output": "gen.h", "rule": "stamp"});
        let record = normalize_record(0, &raw).unwrap();
        assert!(record.inputs.is_empty());
    }

    #[test]
    fn each_mandatory_field_is_reported() {
        let cases = [
            (json!({"output": "a.o", "rule": "cc"}), "inputs"),
            (json!({"inputs": ["a.c"], "rule": "cc"}), "output"),
            (json!({"inputs": ["a.c"], "output": "a.o"}), "rule"),
        ];

        for (raw, expected) in cases {
            match normalize_record(7, &raw) {
                Err(Error::MissingField { record, field }) => {
                    assert_eq!(record, 7);
                    assert_eq!(field, expected);
                }
                other => panic!("expected MissingField({expected}), got {other:?}"),
            }
        }
    }

    #[test]
    fn null_mandatory_field_is_missing() {
        let cases = [
            (json!({"inputs": null, "output": "a.o", "rule": "cc"}), "inputs"),
            (json!({"inputs": ["a.c"], "output": null, "rule": "cc"}), "output"),
            (json!({"inputs": ["a.c"], "output": "a.o", "rule": null}), "rule"),
        ];

        for (raw, expected) in cases {
            match normalize_record(3, &raw) {
                Err(Error::MissingField { record: 3, field }) => assert_eq!(field, expected),
                other => panic!("expected MissingField({expected}), got {other:?}"),
            }
        }
    }

    #[test]
    fn null_headers_default_to_empty() {
        let raw = json!({"inputs": ["a.c"], "output": "a.o", "rule": "cc", "headers": null});
        assert!(normalize_record(0, &raw).unwrap().headers.is_empty());
    }

    #[test]
    fn headers_must_be_strings() {
        let raw = json!({"inputs": [], "output": "a.o", "rule": "cc", "headers": [1, 2]});
        let err = normalize_record(0, &raw).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidField {
                field: "headers",
                ..
            }
        ));
    }

    #[test]
    fn non_object_record_is_invalid() {
        let err = normalize_record(2, &json!(["a.c"])).unwrap_err();
        assert!(matches!(err, Error::InvalidField { record: 2, .. }));
    }

    #[test]
    fn parse_log_rejects_non_array() {
        let path = PathBuf::from("build_log.json");
        let err = parse_log(&path, br#"{"inputs": []}"#).unwrap_err();
        assert!(matches!(err, Error::LogRead { .. }));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn parse_log_rejects_bad_json() {
        let path = PathBuf::from("build_log.json");
        let err = parse_log(&path, b"[{").unwrap_err();
        assert!(matches!(err, Error::LogRead { .. }));
    }

    #[test]
    fn read_log_missing_file() {
        let err = read_log(Path::new("/nonexistent/travlogs/build_log.json")).unwrap_err();
        assert!(matches!(err, Error::LogRead { .. }));
    }
}
