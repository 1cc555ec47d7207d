//! Table builder.
//!
//! A [`TableBuilder`] accumulates the commands a migration issues against one
//! table and compiles them, in a fixed order, into the statements to run:
//!
//! 1. the `CREATE TABLE` or `ALTER TABLE` body
//! 2. `DROP TABLE`
//! 3. column renames
//! 4. indexes (per-column flags first, then explicit [`TableBuilder::index`] calls)
//! 5. foreign keys
//! 6. column drops
//!
//! Updates and conditional drops are compiled against the live schema.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use strata_core::Statement;
use strata_orm::{Database, Model, ModelMetadata, ModelRef};
use tracing::{debug, error, info, warn};

use crate::column::{ColumnDefinition, ForeignKeyDefinition, IndexDefinition};
use crate::column_type::ColumnType;
use crate::error::Result;
use crate::introspect::Inspector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableAction {
    Create,
    Update,
}

/// Accumulates schema commands for one table.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    db: Database,
    table: String,
    model: Option<Arc<ModelMetadata>>,
    action: Option<TableAction>,
    drop: Option<bool>,
    columns: IndexMap<String, ColumnDefinition>,
    renames: Vec<(String, String)>,
    indexes: Vec<IndexDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
    drops: IndexMap<String, bool>,
}

impl TableBuilder {
    /// Creates a builder for `table`.
    #[must_use]
    pub fn new(db: &Database, table: impl Into<String>) -> Self {
        Self {
            db: db.clone(),
            table: table.into(),
            model: None,
            action: None,
            drop: None,
            columns: IndexMap::new(),
            renames: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            drops: IndexMap::new(),
        }
    }

    /// Creates a builder for the table of model `M`.
    ///
    /// Only model-bound builders can declare [`belongs_to`](Self::belongs_to)
    /// columns.
    #[must_use]
    pub fn for_model<M: Model>(db: &Database) -> Self {
        let metadata = db.metadata::<M>();
        let mut builder = Self::new(db, metadata.table());
        builder.model = Some(metadata);
        builder
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the declared columns, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.values()
    }

    // ===== Table actions =====

    /// Creates the table (if it does not exist).
    pub fn create(&mut self) -> &mut Self {
        self.action = Some(TableAction::Create);
        self
    }

    /// Alters the existing table.
    pub fn update(&mut self) -> &mut Self {
        self.action = Some(TableAction::Update);
        self
    }

    /// Drops the table.
    pub fn drop(&mut self) -> &mut Self {
        self.drop = Some(false);
        self
    }

    /// Drops the table if it exists.
    pub fn drop_if_exists(&mut self) -> &mut Self {
        self.drop = Some(true);
        self
    }

    // ===== Columns =====

    /// Adds `column`, replacing an earlier declaration of the same name.
    pub fn add_column(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition {
        match self.columns.entry(column.name().to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(column);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(column),
        }
    }

    fn column(&mut self, name: &str, column_type: ColumnType) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, column_type))
    }

    /// `int`.
    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Int)
    }

    /// `bigint`.
    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::BigInt)
    }

    /// `int unsigned`.
    pub fn unsigned_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.integer(name).unsigned()
    }

    /// `bigint unsigned`.
    pub fn unsigned_big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.big_integer(name).unsigned()
    }

    /// `tinyint`.
    pub fn tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::TinyInt)
    }

    /// `smallint`.
    pub fn small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::SmallInt)
    }

    /// Auto-incrementing unsigned `bigint` primary key.
    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.unsigned_big_integer(name).auto_increment()
    }

    /// Alias of [`increments`](Self::increments).
    pub fn primary_key(&mut self, name: &str) -> &mut ColumnDefinition {
        self.increments(name)
    }

    /// `tinyint(1)`.
    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, ColumnType::TinyInt).with_length(1))
    }

    /// `varchar(length)`.
    pub fn string(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, ColumnType::Varchar).with_length(length))
    }

    /// `char(length)`.
    pub fn char(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, ColumnType::Char).with_length(length))
    }

    /// `text`.
    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Text)
    }

    /// `mediumtext`.
    pub fn medium_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::MediumText)
    }

    /// `longtext`.
    pub fn long_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::LongText)
    }

    /// `decimal(precision, scale)`.
    pub fn decimal(&mut self, name: &str, precision: u8, scale: u8) -> &mut ColumnDefinition {
        self.add_column(
            ColumnDefinition::new(name, ColumnType::Decimal)
                .with_precision(precision)
                .with_scale(scale),
        )
    }

    /// `float`.
    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Float)
    }

    /// `double`.
    pub fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Double)
    }

    /// `date`.
    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Date)
    }

    /// `time` with fractional seconds `precision` (0 for none).
    pub fn time(&mut self, name: &str, precision: u8) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, ColumnType::Time).with_precision(precision))
    }

    /// `datetime` with fractional seconds `precision` (0 for none).
    pub fn datetime(&mut self, name: &str, precision: u8) -> &mut ColumnDefinition {
        self.add_column(
            ColumnDefinition::new(name, ColumnType::DateTime).with_precision(precision),
        )
    }

    /// `timestamp` with fractional seconds `precision` (0 for none).
    pub fn timestamp(&mut self, name: &str, precision: u8) -> &mut ColumnDefinition {
        self.add_column(
            ColumnDefinition::new(name, ColumnType::Timestamp).with_precision(precision),
        )
    }

    /// Nullable `created_at` and `updated_at` timestamps.
    pub fn timestamps(&mut self, precision: u8) {
        self.timestamp("created_at", precision).nullable();
        self.timestamp("updated_at", precision).nullable();
    }

    /// `json`.
    pub fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Json)
    }

    /// `enum('a', 'b', ...)`.
    pub fn enumeration<I, S>(&mut self, name: &str, values: I) -> &mut ColumnDefinition
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_column(ColumnDefinition::new(name, ColumnType::Enum).with_values(values))
    }

    /// `varbinary(length)`.
    pub fn binary(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, ColumnType::Varbinary).with_length(length))
    }

    /// `blob`.
    pub fn blob(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Blob)
    }

    /// Adds the foreign key column for this model's relationship to `R`.
    ///
    /// The builder's model must declare a relationship to `R`. The column is
    /// that relationship's local key, an unsigned `bigint` constrained to the
    /// related key; a differing `column` is reported and the local key wins.
    /// Returns `None`, adding nothing, when no relationship to `R` is
    /// declared.
    pub fn belongs_to<R: Model>(&mut self, column: &str) -> Option<&mut ColumnDefinition> {
        let target = ModelRef::of::<R>();
        let relationship = self
            .model
            .as_ref()
            .and_then(|model| model.relationship_to(&target))
            .cloned();

        let Some(relationship) = relationship else {
            warn!(
                table = %self.table,
                column,
                related = target.name(),
                "belongs_to needs a relationship on the model, skipping"
            );
            return None;
        };

        let local_key = relationship.local_key;
        if local_key != column {
            warn!(
                table = %self.table,
                column,
                local_key = %local_key,
                related = target.name(),
                "belongs_to column differs from the relationship's local key, using the local key"
            );
        }

        let foreign_table = self.db.metadata::<R>().table().to_string();
        self.foreign_keys.push(ForeignKeyDefinition {
            name: format!("{}_{local_key}_foreign", self.table),
            local_key: local_key.clone(),
            foreign_table,
            foreign_key: relationship.foreign_key,
        });
        Some(self.unsigned_big_integer(&local_key))
    }

    // ===== Other commands =====

    /// Adds an index over `columns`, named `<table>_<columns>_index` unless
    /// `name` is given.
    pub fn index<I, S>(&mut self, columns: I, name: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let name = name.map_or_else(
            || IndexDefinition::default_name(&self.table, &columns, false),
            ToString::to_string,
        );
        self.indexes.push(IndexDefinition {
            name,
            columns,
            unique: false,
        });
        self
    }

    /// Renames a column.
    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.renames.push((from.into(), to.into()));
        self
    }

    /// Drops a column.
    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.drops.insert(name.into(), false);
        self
    }

    /// Drops a column if the live table has it.
    pub fn drop_column_if_exists(&mut self, name: impl Into<String>) -> &mut Self {
        self.drops.insert(name.into(), true);
        self
    }

    // ===== Compilation =====

    /// Compiles the accumulated commands into statements.
    ///
    /// Columns whose type cannot be rendered are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the live schema cannot be read.
    pub async fn compile(&self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        let mut skipped = HashSet::new();

        match self.action {
            Some(TableAction::Create) => {
                let (statement, unrenderable) = self.compile_create();
                statements.extend(statement);
                skipped = unrenderable;
            }
            Some(TableAction::Update) => {
                let (statement, unused) = self.compile_update().await?;
                statements.extend(statement);
                skipped = unused;
            }
            None => {}
        }

        if let Some(if_exists) = self.drop {
            let sql = if if_exists {
                "DROP TABLE IF EXISTS ??"
            } else {
                "DROP TABLE ??"
            };
            statements.push(Statement::new(sql).ident(&self.table));
        }

        for (from, to) in &self.renames {
            statements.push(
                Statement::new("ALTER TABLE ?? RENAME COLUMN ?? TO ??")
                    .ident(&self.table)
                    .ident(from)
                    .ident(to),
            );
        }

        for index in self.column_indexes(&skipped).iter().chain(&self.indexes) {
            statements.push(index.to_statement(&self.table));
        }

        for foreign_key in &self.foreign_keys {
            statements.push(foreign_key.to_statement(&self.table));
        }

        statements.extend(self.compile_drops().await?);

        for statement in &statements {
            debug!(table = %self.table, sql = %statement, "Compiled statement");
        }
        Ok(statements)
    }

    fn definition(&self, column: &ColumnDefinition, name: &str) -> Option<Statement> {
        match column.definition(name) {
            Ok(statement) => Some(statement),
            Err(e) => {
                error!(
                    table = %self.table,
                    column = column.name(),
                    error = %e,
                    "Cannot render column, skipping"
                );
                None
            }
        }
    }

    /// Returns the `CREATE TABLE` statement, if any column renders, and the
    /// columns left out because their type cannot be rendered.
    fn compile_create(&self) -> (Option<Statement>, HashSet<String>) {
        let mut skipped = HashSet::new();
        let mut definitions = Vec::new();
        for column in self.columns.values() {
            match self.definition(column, column.name()) {
                Some(definition) => definitions.push(definition),
                None => {
                    skipped.insert(column.name().to_string());
                }
            }
        }
        if definitions.is_empty() {
            warn!(table = %self.table, "Create has no columns, skipping");
            return (None, skipped);
        }

        let mut statement = Statement::new("CREATE TABLE IF NOT EXISTS ?? (").ident(&self.table);
        join_into(&mut statement, definitions);
        statement.push_sql(")");
        (Some(statement), skipped)
    }

    /// Returns the `ALTER TABLE` statement, if any clause remains, and the
    /// columns it leaves out: those the live table already has and those
    /// whose type cannot be rendered.
    async fn compile_update(&self) -> Result<(Option<Statement>, HashSet<String>)> {
        if self.columns.is_empty() {
            return Ok((None, HashSet::new()));
        }
        let live = self.live_columns().await?;
        let mut skipped = HashSet::new();
        let mut clauses = Vec::new();

        for column in self.columns.values() {
            let exists = live.contains(&column.name().to_lowercase());
            if exists && !column.is_change() {
                warn!(
                    table = %self.table,
                    column = column.name(),
                    "Column already exists, skipping"
                );
                skipped.insert(column.name().to_string());
                continue;
            }

            let target = column.renamed_to().unwrap_or_else(|| column.name());
            let Some(definition) = self.definition(column, target) else {
                skipped.insert(column.name().to_string());
                continue;
            };
            let mut clause = match (exists, column.renamed_to()) {
                (true, Some(_)) => Statement::new("CHANGE COLUMN ?? ").ident(column.name()),
                (true, None) => Statement::new("MODIFY COLUMN "),
                (false, _) => Statement::new("ADD "),
            };
            clause.append(definition);
            clauses.push(clause);
        }

        if clauses.is_empty() {
            return Ok((None, skipped));
        }
        let mut statement = Statement::new("ALTER TABLE ?? ").ident(&self.table);
        join_into(&mut statement, clauses);
        Ok((Some(statement), skipped))
    }

    fn column_indexes(&self, skipped: &HashSet<String>) -> Vec<IndexDefinition> {
        let mut indexes = Vec::new();
        for column in self.columns.values() {
            if skipped.contains(column.name()) {
                continue;
            }
            let columns = vec![column.renamed_to().unwrap_or_else(|| column.name()).to_string()];
            let flags = [
                (column.is_unique(), column.unique_name(), true),
                (column.is_indexed(), column.index_name(), false),
            ];
            for (enabled, custom, unique) in flags {
                if enabled {
                    indexes.push(IndexDefinition {
                        name: custom.map_or_else(
                            || IndexDefinition::default_name(&self.table, &columns, unique),
                            ToString::to_string,
                        ),
                        columns: columns.clone(),
                        unique,
                    });
                }
            }
        }
        indexes
    }

    async fn compile_drops(&self) -> Result<Option<Statement>> {
        if self.drops.is_empty() {
            return Ok(None);
        }
        let live = if self.drops.values().any(|if_exists| *if_exists) {
            self.live_columns().await?
        } else {
            HashSet::new()
        };

        let mut clauses = Vec::new();
        for (name, if_exists) in &self.drops {
            if *if_exists && !live.contains(&name.to_lowercase()) {
                info!(table = %self.table, column = %name, "Column does not exist, skipping drop");
                continue;
            }
            clauses.push(Statement::new("DROP COLUMN ??").ident(name));
        }

        if clauses.is_empty() {
            return Ok(None);
        }
        let mut statement = Statement::new("ALTER TABLE ?? ").ident(&self.table);
        join_into(&mut statement, clauses);
        Ok(Some(statement))
    }

    async fn live_columns(&self) -> Result<HashSet<String>> {
        Ok(Inspector::new(&self.db)
            .columns(&self.table)
            .await?
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect())
    }
}

fn join_into(statement: &mut Statement, parts: Vec<Statement>) {
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            statement.push_sql(", ");
        }
        statement.append(part);
    }
}
