//! Live schema inspection.
//!
//! Reads the current database's tables and columns through the ORM driver.
//! Table builders consult it before altering a table so that re-running a
//! migration does not add a column twice or drop one that is already gone.

use strata_core::{SqlValue, Statement};
use strata_orm::{Attributes, Database};

use crate::column_type::ColumnType;
use crate::error::Result;

/// A column as reported by `SHOW FIELDS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub field: String,
    /// Parsed type, if it belongs to the known vocabulary.
    pub column_type: Option<ColumnType>,
    /// Type string as reported, e.g. `bigint(20) unsigned`.
    pub native_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Key kind (`PRI`, `UNI`, `MUL` or empty).
    pub key: String,
    /// Default value as reported.
    pub default: Option<String>,
    /// Extra attributes (`auto_increment`, ...).
    pub extra: String,
}

impl ColumnInfo {
    fn from_row(row: &Attributes) -> Self {
        let native_type = text(row, "Type").unwrap_or_default();
        Self {
            field: text(row, "Field").unwrap_or_default(),
            column_type: ColumnType::from_native(&native_type),
            native_type,
            nullable: text(row, "Null").is_some_and(|n| n.eq_ignore_ascii_case("YES")),
            key: text(row, "Key").unwrap_or_default(),
            default: text(row, "Default"),
            extra: text(row, "Extra").unwrap_or_default(),
        }
    }
}

/// Reads a column as text. `SHOW` statements report some columns as binary.
fn text(row: &Attributes, key: &str) -> Option<String> {
    match row.value(key)? {
        SqlValue::Null => None,
        SqlValue::Text(s) => Some(s.clone()),
        SqlValue::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        other => Some(other.to_sql_inline()),
    }
}

/// Schema inspector for the connected database.
#[derive(Debug, Clone)]
pub struct Inspector {
    db: Database,
}

impl Inspector {
    /// Creates an inspector over `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Lists the base tables of the current database.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows = self
            .db
            .fetch(&Statement::new(
                "SHOW FULL TABLES WHERE table_type = 'BASE TABLE'",
            ))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.keys()
                    .find(|key| !key.eq_ignore_ascii_case("Table_type"))
                    .and_then(|key| text(row, key))
            })
            .collect())
    }

    /// Returns true if `table` exists as a base table.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn has_table(&self, table: &str) -> Result<bool> {
        let rows = self
            .db
            .fetch(
                &Statement::new(
                    "SELECT table_name FROM information_schema.tables \
                     WHERE table_schema = DATABASE() AND table_name = ? \
                     AND table_type = 'BASE TABLE'",
                )
                .bind(table),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Lists the column names of `table`, in table order.
    ///
    /// An unknown table has no columns.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = self
            .db
            .fetch(
                &Statement::new(
                    "SELECT column_name AS `column_name` FROM information_schema.columns \
                     WHERE table_schema = DATABASE() AND table_name = ? \
                     ORDER BY ordinal_position",
                )
                .bind(table),
            )
            .await?;
        Ok(rows.iter().filter_map(|row| text(row, "column_name")).collect())
    }

    /// Returns true if `table` has `column`, compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        self.has_columns(table, &[column]).await
    }

    /// Returns true if `table` has every one of `columns`.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn has_columns(&self, table: &str, columns: &[&str]) -> Result<bool> {
        let live = self.columns(table).await?;
        Ok(columns
            .iter()
            .all(|wanted| live.iter().any(|c| c.eq_ignore_ascii_case(wanted))))
    }

    /// Describes every column of `table`.
    ///
    /// # Errors
    ///
    /// Returns the driver error, including for an unknown table.
    pub async fn column_types(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self
            .db
            .fetch(&Statement::new("SHOW FIELDS FROM ??").ident(table))
            .await?;
        Ok(rows.iter().map(ColumnInfo::from_row).collect())
    }

    /// Returns the type of `table.column`, if the column exists and its type
    /// is part of the known vocabulary.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn column_type(&self, table: &str, column: &str) -> Result<Option<ColumnType>> {
        Ok(self
            .column_types(table)
            .await?
            .into_iter()
            .find(|info| info.field.eq_ignore_ascii_case(column))
            .and_then(|info| info.column_type))
    }
}
