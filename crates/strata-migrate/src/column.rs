//! Column, index and foreign key definitions.
//!
//! A [`ColumnDefinition`] is created by one of the
//! [`TableBuilder`](crate::table::TableBuilder) helpers and refined through
//! its chainable modifiers:
//!
//! ```ignore
//! table.string("email", 255).unique();
//! table.boolean("is_admin").default(false);
//! table.timestamp("seen_at", 3).nullable().use_current_timestamp();
//! ```

use strata_core::{SqlValue, Statement, ToSqlValue};

use crate::column_type::ColumnType;
use crate::error::Result;

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A literal, rendered escaped.
    Value(SqlValue),
    /// Raw SQL expression (e.g., `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of the default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Value(value) => value.to_sql_inline(),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// A column in a table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    unique: bool,
    unique_name: Option<String>,
    index: bool,
    index_name: Option<String>,
    length: Option<u32>,
    precision: Option<u8>,
    scale: Option<u8>,
    default: Option<DefaultValue>,
    auto_increment: bool,
    unsigned: bool,
    use_current_timestamp: bool,
    values: Vec<String>,
    rename_to: Option<String>,
    change: bool,
}

impl ColumnDefinition {
    /// Creates a NOT NULL column of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            unique: false,
            unique_name: None,
            index: false,
            index_name: None,
            length: None,
            precision: None,
            scale: None,
            default: None,
            auto_increment: false,
            unsigned: false,
            use_current_timestamp: false,
            values: Vec::new(),
            rename_to: None,
            change: false,
        }
    }

    /// Sets the display width or character length.
    #[must_use]
    pub const fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the decimal precision or fractional seconds precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets the decimal scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the permitted values of an enum or set column.
    #[must_use]
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    // ===== Modifiers =====

    /// Allows NULL.
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    /// Rejects NULL (the default).
    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    /// Adds a unique index on this column.
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Adds a unique index with a custom name.
    pub fn unique_named(&mut self, name: impl Into<String>) -> &mut Self {
        self.unique = true;
        self.unique_name = Some(name.into());
        self
    }

    /// Adds a plain index on this column.
    pub fn index(&mut self) -> &mut Self {
        self.index = true;
        self
    }

    /// Adds a plain index with a custom name.
    pub fn index_named(&mut self, name: impl Into<String>) -> &mut Self {
        self.index = true;
        self.index_name = Some(name.into());
        self
    }

    /// Sets a literal default value.
    pub fn default(&mut self, value: impl ToSqlValue) -> &mut Self {
        self.default = Some(DefaultValue::Value(value.to_sql_value()));
        self
    }

    /// Sets a raw SQL expression as default.
    pub fn default_raw(&mut self, expr: impl Into<String>) -> &mut Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    /// Marks a numeric column unsigned.
    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    /// Makes this the auto-increment primary key.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Defaults a datetime or timestamp column to `CURRENT_TIMESTAMP`.
    pub fn use_current_timestamp(&mut self) -> &mut Self {
        self.use_current_timestamp = true;
        self
    }

    /// Renames the column when the table is updated. Implies [`change`].
    ///
    /// [`change`]: Self::change
    pub fn rename_to(&mut self, name: impl Into<String>) -> &mut Self {
        self.rename_to = Some(name.into());
        self.change = true;
        self
    }

    /// Modifies the column in place if it already exists on the live table.
    pub fn change(&mut self) -> &mut Self {
        self.change = true;
        self
    }

    // ===== Accessors =====

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether NULL is allowed.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether a unique index is requested.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Custom unique index name, if any.
    #[must_use]
    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    /// Whether a plain index is requested.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.index
    }

    /// Custom plain index name, if any.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Display width or character length.
    #[must_use]
    pub const fn length(&self) -> Option<u32> {
        self.length
    }

    /// Decimal precision or fractional seconds precision.
    #[must_use]
    pub const fn precision(&self) -> Option<u8> {
        self.precision
    }

    /// Decimal scale.
    #[must_use]
    pub const fn scale(&self) -> Option<u8> {
        self.scale
    }

    /// Permitted values of an enum or set column.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Default value, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Whether this is the auto-increment primary key.
    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Whether the column is unsigned.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    /// Whether the column defaults to `CURRENT_TIMESTAMP`.
    #[must_use]
    pub const fn uses_current_timestamp(&self) -> bool {
        self.use_current_timestamp
    }

    /// New name requested by [`rename_to`](Self::rename_to).
    #[must_use]
    pub fn renamed_to(&self) -> Option<&str> {
        self.rename_to.as_deref()
    }

    /// Whether an existing live column is modified in place.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        self.change
    }

    /// Renders `?? TYPE [DEFAULT x] [auto_increment primary key | null | not null]`
    /// with the column name as the identifier.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ColumnType::render`].
    pub fn to_statement(&self) -> Result<Statement> {
        self.definition(&self.name)
    }

    /// Renders the column definition under the name `name`.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ColumnType::render`].
    pub fn definition(&self, name: &str) -> Result<Statement> {
        let mut sql = format!("?? {}", self.column_type.render(self)?);

        // The type clause already carries the CURRENT_TIMESTAMP default.
        let current_default = self.use_current_timestamp
            && matches!(
                self.column_type,
                ColumnType::DateTime | ColumnType::Timestamp
            );
        if let Some(default) = self.default.as_ref().filter(|_| !current_default) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }

        sql.push_str(if self.auto_increment {
            " auto_increment primary key"
        } else if self.nullable {
            " null"
        } else {
            " not null"
        });

        Ok(Statement::new(sql).ident(name))
    }
}

/// An index command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index is unique.
    pub unique: bool,
}

impl IndexDefinition {
    /// Returns the conventional name `<table>_<columns>_<unique|index>`,
    /// lowercased.
    #[must_use]
    pub fn default_name(table: &str, columns: &[String], unique: bool) -> String {
        let suffix = if unique { "unique" } else { "index" };
        format!("{table}_{}_{suffix}", columns.join("_")).to_lowercase()
    }

    /// Renders `CREATE [UNIQUE] INDEX ?? ON ?? (??, ...)`.
    #[must_use]
    pub fn to_statement(&self, table: &str) -> Statement {
        let placeholders = vec!["??"; self.columns.len()].join(", ");
        let kind = if self.unique { "UNIQUE INDEX" } else { "INDEX" };
        let statement = Statement::new(format!("CREATE {kind} ?? ON ?? ({placeholders})"))
            .ident(&self.name)
            .ident(table);
        self.columns
            .iter()
            .fold(statement, |statement, column| statement.ident(column))
    }
}

/// A foreign key constraint command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    /// Constraint name.
    pub name: String,
    /// Column on this table.
    pub local_key: String,
    /// Referenced table.
    pub foreign_table: String,
    /// Referenced column.
    pub foreign_key: String,
}

impl ForeignKeyDefinition {
    /// Renders `ALTER TABLE ?? ADD CONSTRAINT ?? FOREIGN KEY (??) REFERENCES ?? (??)`.
    #[must_use]
    pub fn to_statement(&self, table: &str) -> Statement {
        Statement::new("ALTER TABLE ?? ADD CONSTRAINT ?? FOREIGN KEY (??) REFERENCES ?? (??)")
            .ident(table)
            .ident(&self.name)
            .ident(&self.local_key)
            .ident(&self.foreign_table)
            .ident(&self.foreign_key)
    }
}
