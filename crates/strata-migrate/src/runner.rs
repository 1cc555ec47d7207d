//! Migration runner.
//!
//! Migrations are plain types implementing [`Migration`]. Their `up` and
//! `down` methods describe table changes on a [`Schema`]; the runner compiles
//! each table builder against the live database and executes the result,
//! one migration at a time, recording progress in the history table.
//!
//! Migrations are not transactional. MySQL commits DDL implicitly, so a
//! statement failing halfway through leaves the earlier statements applied
//! and the migration unrecorded.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use strata_core::Statement;
use strata_orm::{Database, Model};
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::history::{MigrationRecord, MigrationRepository};
use crate::table::TableBuilder;

/// A named, reversible schema change.
///
/// # Example
///
/// ```ignore
/// struct CreateUsersTable;
///
/// impl Migration for CreateUsersTable {
///     fn name(&self) -> &str {
///         "0001_create_users_table"
///     }
///
///     fn up(&self, schema: &mut Schema) {
///         schema.create::<User>(|table| {
///             table.increments("id");
///             table.string("username", 255);
///             table.timestamps(0);
///         });
///     }
///
///     fn down(&self, schema: &mut Schema) {
///         schema.drop_if_exists::<User>();
///     }
/// }
/// ```
pub trait Migration: Send + Sync {
    /// Unique name, recorded in the history table.
    fn name(&self) -> &str;

    /// Applies the change.
    fn up(&self, schema: &mut Schema);

    /// Reverts the change.
    fn down(&self, schema: &mut Schema);
}

/// Which half of a migration to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// [`Migration::up`].
    Up,
    /// [`Migration::down`].
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Collects the table builders of one migration direction.
#[derive(Debug)]
pub struct Schema {
    db: Database,
    tables: Vec<TableBuilder>,
}

impl Schema {
    /// Creates an empty schema over `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            tables: Vec::new(),
        }
    }

    fn push(&mut self, mut table: TableBuilder, build: impl FnOnce(&mut TableBuilder)) {
        build(&mut table);
        self.tables.push(table);
    }

    /// Creates the table of model `M`.
    pub fn create<M: Model>(&mut self, build: impl FnOnce(&mut TableBuilder)) {
        let mut table = TableBuilder::for_model::<M>(&self.db);
        table.create();
        self.push(table, build);
    }

    /// Alters the table of model `M`.
    pub fn update<M: Model>(&mut self, build: impl FnOnce(&mut TableBuilder)) {
        let mut table = TableBuilder::for_model::<M>(&self.db);
        table.update();
        self.push(table, build);
    }

    /// Drops the table of model `M`.
    pub fn drop<M: Model>(&mut self) {
        let mut table = TableBuilder::for_model::<M>(&self.db);
        table.drop();
        self.tables.push(table);
    }

    /// Drops the table of model `M` if it exists.
    pub fn drop_if_exists<M: Model>(&mut self) {
        let mut table = TableBuilder::for_model::<M>(&self.db);
        table.drop_if_exists();
        self.tables.push(table);
    }

    /// Creates a table by name.
    pub fn create_table(&mut self, name: &str, build: impl FnOnce(&mut TableBuilder)) {
        let mut table = TableBuilder::new(&self.db, name);
        table.create();
        self.push(table, build);
    }

    /// Alters a table by name.
    pub fn update_table(&mut self, name: &str, build: impl FnOnce(&mut TableBuilder)) {
        let mut table = TableBuilder::new(&self.db, name);
        table.update();
        self.push(table, build);
    }

    /// Drops a table by name.
    pub fn drop_table(&mut self, name: &str) {
        let mut table = TableBuilder::new(&self.db, name);
        table.drop();
        self.tables.push(table);
    }

    /// Drops a table by name if it exists.
    pub fn drop_table_if_exists(&mut self, name: &str) {
        let mut table = TableBuilder::new(&self.db, name);
        table.drop_if_exists();
        self.tables.push(table);
    }

    /// Table builders, in the order they were declared.
    #[must_use]
    pub fn tables(&self) -> &[TableBuilder] {
        &self.tables
    }
}

/// Applied state of one known migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Migration name.
    pub name: String,
    /// Batch it was applied in, `None` if pending.
    pub batch: Option<i64>,
}

impl MigrationStatus {
    /// Returns true if the migration has been applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.batch.is_some()
    }
}

/// Applies and reverts migrations.
pub struct MigrationRunner {
    db: Database,
    repository: MigrationRepository,
    migrations: Vec<Box<dyn Migration>>,
    dry_run: bool,
}

impl fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("migrations", &self.names())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl MigrationRunner {
    /// Creates a runner with no migrations.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            repository: MigrationRepository::new(db),
            migrations: Vec::new(),
            dry_run: false,
        }
    }

    /// Adds a migration. Migrations run in the order they are added.
    #[must_use]
    pub fn migration(mut self, migration: impl Migration + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Adds migrations.
    #[must_use]
    pub fn migrations(mut self, migrations: impl IntoIterator<Item = Box<dyn Migration>>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Enables dry-run mode (SQL is printed but not executed or recorded).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns the migration history.
    #[must_use]
    pub const fn repository(&self) -> &MigrationRepository {
        &self.repository
    }

    /// Names of the known migrations, in run order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.name()).collect()
    }

    fn find(&self, name: &str) -> Option<&dyn Migration> {
        for migration in &self.migrations {
            if migration.name() == name {
                return Some(migration.as_ref());
            }
        }
        None
    }

    /// Ensures the migrations history table exists.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn init(&self) -> Result<()> {
        if !self.dry_run {
            self.repository.ensure_table().await?;
        }
        Ok(())
    }

    /// Prepares the history table. In dry-run mode nothing is created and
    /// false is returned when the table is missing.
    async fn history_available(&self) -> Result<bool> {
        if self.dry_run {
            return self.repository.exists().await;
        }
        self.repository.ensure_table().await?;
        Ok(true)
    }

    /// Runs every pending migration as one batch. Returns the names applied.
    ///
    /// # Errors
    ///
    /// Stops at the first failing migration with
    /// [`MigrateError::PartialMigration`] for a rejected statement, or
    /// [`MigrateError::TableCompilation`] when a table cannot be compiled;
    /// migrations before it stay recorded.
    pub async fn run_up(&self) -> Result<Vec<String>> {
        let (pending, batch) = if self.history_available().await? {
            let pending = self.repository.pending(self.names()).await?;
            let batch = if pending.is_empty() {
                0
            } else {
                self.repository.next_batch_number().await?
            };
            (pending, batch)
        } else {
            (self.names().into_iter().map(String::from).collect(), 1)
        };

        if pending.is_empty() {
            info!("Nothing to migrate");
            return Ok(pending);
        }

        info!(count = pending.len(), batch, "Running migrations");
        for name in &pending {
            let Some(migration) = self.find(name) else {
                continue;
            };
            self.run(migration, Direction::Up).await?;
            if !self.dry_run {
                self.repository.log(name, batch).await?;
            }
        }
        Ok(pending)
    }

    /// Reverts every applied migration, newest first. Returns the names
    /// reverted.
    ///
    /// # Errors
    ///
    /// Stops at the first failing migration.
    pub async fn run_down(&self) -> Result<Vec<String>> {
        if !self.history_available().await? {
            info!("Nothing to roll back");
            return Ok(Vec::new());
        }
        let records = self.repository.ran().await?;
        self.revert(records).await
    }

    /// Reverts the most recent batch. Returns the names reverted.
    ///
    /// # Errors
    ///
    /// Stops at the first failing migration.
    pub async fn rollback(&self) -> Result<Vec<String>> {
        if !self.history_available().await? {
            info!("Nothing to roll back");
            return Ok(Vec::new());
        }
        let records = self.repository.last_batch().await?;
        self.revert(records).await
    }

    async fn revert(&self, records: Vec<MigrationRecord>) -> Result<Vec<String>> {
        if records.is_empty() {
            info!("Nothing to roll back");
        }
        let mut reverted = Vec::new();
        for record in records {
            let Some(migration) = self.find(&record.migration) else {
                warn!(
                    migration = %record.migration,
                    batch = record.batch,
                    "Migration not found, skipping"
                );
                continue;
            };
            self.run(migration, Direction::Down).await?;
            if !self.dry_run {
                self.repository.delete(&record.migration).await?;
            }
            reverted.push(record.migration);
        }
        Ok(reverted)
    }

    /// Reports which known migrations are applied.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let ran = if self.repository.exists().await? {
            self.repository.ran().await?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .map(|migration| MigrationStatus {
                name: migration.name().to_string(),
                batch: ran
                    .iter()
                    .find(|r| r.migration == migration.name())
                    .map(|r| r.batch),
            })
            .collect())
    }

    /// Compiles one direction of `migration` without executing it.
    ///
    /// Updates and conditional drops still read the live schema.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn sql_for(
        &self,
        migration: &dyn Migration,
        direction: Direction,
    ) -> Result<Vec<Statement>> {
        let schema = self.schema(migration, direction);
        let mut statements = Vec::new();
        for table in schema.tables() {
            statements.extend(table.compile().await?);
        }
        Ok(statements)
    }

    /// Compiles one direction of the migration named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MigrationNotFound`] for an unknown name.
    pub async fn sql_for_name(&self, name: &str, direction: Direction) -> Result<Vec<Statement>> {
        let migration = self
            .find(name)
            .ok_or_else(|| MigrateError::MigrationNotFound(name.to_string()))?;
        self.sql_for(migration, direction).await
    }

    fn schema(&self, migration: &dyn Migration, direction: Direction) -> Schema {
        let mut schema = Schema::new(&self.db);
        match direction {
            Direction::Up => migration.up(&mut schema),
            Direction::Down => migration.down(&mut schema),
        }
        schema
    }

    async fn run(&self, migration: &dyn Migration, direction: Direction) -> Result<()> {
        let name = migration.name();
        info!(migration = name, direction = %direction, "Running migration");
        let started = Instant::now();

        let schema = self.schema(migration, direction);
        for table in schema.tables() {
            let statements = table.compile().await.map_err(|source| {
                MigrateError::TableCompilation {
                    migration: name.to_string(),
                    table: table.table().to_string(),
                    source: Box::new(source),
                }
            })?;
            for statement in statements {
                debug!(sql = %statement, "Executing SQL");
                if self.dry_run {
                    println!("{statement};");
                    continue;
                }
                self.db
                    .execute(&statement)
                    .await
                    .map_err(|source| MigrateError::PartialMigration {
                        migration: name.to_string(),
                        statement: statement.to_string(),
                        source,
                    })?;
            }
        }

        info!(
            migration = name,
            direction = %direction,
            elapsed = ?started.elapsed(),
            "Migration complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_orm::RecordingDriver;

    use super::*;
    use crate::fixtures::{Author, Post};

    #[test]
    fn test_schema_collects_builders_in_order() {
        let db = Database::new(RecordingDriver::new());
        let mut schema = Schema::new(&db);
        schema.create::<Author>(|table| {
            table.increments("id");
        });
        schema.update::<Post>(|table| {
            table.text("body");
        });
        schema.drop_table_if_exists("legacy_posts");

        let tables: Vec<&str> = schema.tables().iter().map(TableBuilder::table).collect();
        assert_eq!(tables, ["authors", "posts", "legacy_posts"]);
        assert_eq!(schema.tables()[1].columns().count(), 1);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
    }
}
