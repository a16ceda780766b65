//! Translation from collaborator-native shapes to typed graph values
//!
//! Every adapter funnels raw records (JSON objects, SQL rows) through these
//! functions. Nothing untyped is visible outside the graph module.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{DependencySymbol, GraphError};

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Symbol from a JSON object `{name, qualified_name?, file_path}`.
///
/// `qualified_name` defaults to `<file_path>::<name>`. `file` is accepted
/// for `file_path`.
pub fn symbol_from_json(value: &Value) -> Result<DependencySymbol, GraphError> {
    let obj = value
        .as_object()
        .ok_or_else(|| GraphError::Snapshot(format!("symbol is not an object: {value}")))?;
    let name = str_field(obj, "name")
        .ok_or_else(|| GraphError::Snapshot(format!("symbol without a name: {value}")))?;
    let file_path = str_field(obj, "file_path")
        .or_else(|| str_field(obj, "file"))
        .ok_or_else(|| GraphError::Snapshot(format!("symbol '{name}' without a file_path")))?;
    let qualified_name = str_field(obj, "qualified_name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{file_path}::{name}"));

    Ok(DependencySymbol {
        name: name.to_string(),
        qualified_name,
        file_path: file_path.to_string(),
    })
}

/// Symbol from a `(name, qualified_name, file_path)` row.
pub fn symbol_from_row(row: &SqliteRow) -> Result<DependencySymbol, sqlx::Error> {
    Ok(DependencySymbol {
        name: row.try_get(0)?,
        qualified_name: row.try_get(1)?,
        file_path: row.try_get(2)?,
    })
}
