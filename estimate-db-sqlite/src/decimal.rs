use std::str::FromStr;

use estimate_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::{Row, TypeInfo, ValueRef};

/// Reads a decimal column stored as TEXT, INTEGER or REAL.
///
/// Money is written as TEXT so it survives exactly; numbers typed by hand
/// into seed files come back as INTEGER or REAL.
pub fn get_decimal(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;

    if value_ref.is_null() {
        return Err(RepositoryError::InvalidData(format!(
            "Column '{column}' is NULL"
        )));
    }

    let type_info = value_ref.type_info();
    match type_info.name() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{column}': {e}"))
            })?;
            Decimal::from_str(text.trim()).map_err(|e| {
                RepositoryError::InvalidData(format!("'{text}' in '{column}' is not a decimal: {e}"))
            })
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{column}': {e}"))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{column}': {e}"))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::InvalidData(format!("Failed to convert {val} to Decimal: {e}"))
            })
        }
        other => Err(RepositoryError::InvalidData(format!(
            "Unexpected type '{other}' for column '{column}'"
        ))),
    }
}

/// Text form used for storage; parses back to the same value and scale.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}
