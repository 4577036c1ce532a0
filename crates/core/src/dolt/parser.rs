//! Parsers for `dolt sql -r json` output.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::conflict::RowConflict;
use crate::errors::DoltError;

/// One result row, column name to value. Dolt omits NULL columns.
pub type SqlRow = Map<String, Value>;

/// Column prefixes of a `dolt_conflicts_<table>` row.
const OUR_PREFIX: &str = "our_";
const THEIR_PREFIX: &str = "their_";
const BASE_PREFIX: &str = "base_";

/// Parse a JSON result set (`{"rows": [...]}`). Empty output means zero rows.
pub fn parse_sql_rows(output: &str) -> Result<Vec<SqlRow>, DoltError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    debug!("parsing dolt json result ({} bytes)", trimmed.len());

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| DoltError::OutputParseError(format!("invalid json: {e}")))?;
    let rows = match value.get("rows") {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(DoltError::OutputParseError(format!(
                "expected 'rows' array, found {other}"
            )))
        }
    };

    rows.iter()
        .map(|row| match row {
            Value::Object(map) => Ok(map.clone()),
            other => Err(DoltError::OutputParseError(format!(
                "expected row object, found {other}"
            ))),
        })
        .collect()
}

/// Render a SQL value as plain text: strings unquoted, everything else as
/// JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First column of the first row, as text. `None` for no rows or NULL.
pub fn scalar(rows: &[SqlRow]) -> Option<String> {
    let row = rows.first()?;
    let value = row.values().next()?;
    match value {
        Value::Null => None,
        v => Some(value_text(v)),
    }
}

/// Interpret a SQL boolean (`true`, `1`, `"1"`, `"true"`).
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        _ => false,
    }
}

/// Table names and conflict counts from the `dolt_conflicts` system table.
pub fn parse_conflict_summary(rows: &[SqlRow]) -> Vec<(String, u64)> {
    rows.iter()
        .filter_map(|row| {
            let table = row.get("table").map(value_text)?;
            let count = match row.get("num_conflicts") {
                Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
                Some(Value::String(s)) => s.parse().unwrap_or(0),
                _ => 0,
            };
            if table.is_empty() {
                warn!("skipping dolt_conflicts row without table name");
                return None;
            }
            Some((table, count))
        })
        .collect()
}

/// Collect one side of a conflict row into an object, stripping `prefix`.
/// Returns `None` when the side was removed or all of its columns are NULL.
fn side(row: &SqlRow, prefix: &str, diff_type_col: &str) -> Option<Value> {
    if row.get(diff_type_col).map(value_text).as_deref() == Some("removed") {
        return None;
    }
    let fields: Map<String, Value> = row
        .iter()
        .filter(|(col, _)| col.as_str() != diff_type_col)
        .filter_map(|(col, v)| {
            col.strip_prefix(prefix)
                .map(|name| (name.to_string(), v.clone()))
        })
        .filter(|(_, v)| !v.is_null())
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

/// Render the primary key of a conflict row. Key columns are looked up on
/// our side, then theirs, then the base; without key columns the conflict
/// id is used.
fn row_key(row: &SqlRow, pk_columns: &[String]) -> String {
    if pk_columns.is_empty() {
        return row
            .get("dolt_conflict_id")
            .map(value_text)
            .unwrap_or_default();
    }
    pk_columns
        .iter()
        .map(|col| {
            [OUR_PREFIX, THEIR_PREFIX, BASE_PREFIX]
                .iter()
                .find_map(|prefix| {
                    row.get(&format!("{prefix}{col}"))
                        .filter(|v| !v.is_null())
                        .map(value_text)
                })
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert `dolt_conflicts_<table>` rows into [`RowConflict`]s.
pub fn parse_row_conflicts(table: &str, pk_columns: &[String], rows: &[SqlRow]) -> Vec<RowConflict> {
    let conflicts: Vec<RowConflict> = rows
        .iter()
        .map(|row| RowConflict {
            table: table.to_string(),
            key: row_key(row, pk_columns),
            ours: side(row, OUR_PREFIX, "our_diff_type"),
            theirs: side(row, THEIR_PREFIX, "their_diff_type"),
        })
        .collect();
    debug!(table, count = conflicts.len(), "parsed row conflicts");
    conflicts
}

/// Column names from an `information_schema` key lookup, in order.
pub fn parse_column_names(rows: &[SqlRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| {
            row.get("column_name")
                .or_else(|| row.get("COLUMN_NAME"))
                .map(value_text)
        })
        .filter(|c| !c.is_empty())
        .collect()
}
