//! UUID utilities
//!
//! Identifiers are stored as hyphenated TEXT columns, so rows are decoded
//! through these helpers rather than sqlx's BLOB mapping.

use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Read a NOT NULL id column
pub fn column(row: &SqliteRow, name: &str) -> Result<Uuid> {
    let raw: String = row.try_get(name)?;
    Uuid::parse_str(&raw)
        .map_err(|e| Error::Internal(format!("corrupt id in column {}: {} ({})", name, raw, e)))
}
