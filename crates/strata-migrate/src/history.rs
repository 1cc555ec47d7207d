//! Migration history tracking.
//!
//! This module manages the `migrations` table that records which migrations
//! have been applied to the database and in which batch.

use strata_orm::prelude::*;
use strata_orm::OrmError;
use tracing::info;

use crate::error::Result;
use crate::introspect::Inspector;
use crate::table::TableBuilder;

/// Name of the history table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// A row of the history table.
#[derive(Debug)]
pub struct MigrationRecord {
    /// Unique ID in the migrations table.
    pub id: i64,
    /// Migration name.
    pub migration: String,
    /// Batch the migration was applied in.
    pub batch: i64,
    relations: Relations,
}

impl Model for MigrationRecord {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("MigrationRecord")
            .table(MIGRATIONS_TABLE)
            .field("migration", AttributeType::String)
            .cast_field("batch", AttributeType::Integer, CastType::Int)
    }

    fn from_attributes(attributes: &Attributes) -> std::result::Result<Self, OrmError> {
        Ok(Self {
            id: attributes.get("id")?,
            migration: attributes.get("migration")?,
            batch: attributes.get("batch")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with("id", self.id)
            .with("migration", self.migration.as_str())
            .with("batch", self.batch)
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

/// Reads and writes the migration history.
#[derive(Debug, Clone)]
pub struct MigrationRepository {
    db: Database,
}

impl MigrationRepository {
    /// Creates a repository over `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Returns true if the history table exists.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn exists(&self) -> Result<bool> {
        Inspector::new(&self.db).has_table(MIGRATIONS_TABLE).await
    }

    /// Builder for the history table.
    #[must_use]
    pub fn table_definition(&self) -> TableBuilder {
        let mut table = TableBuilder::for_model::<MigrationRecord>(&self.db);
        table.create();
        table.integer("id").auto_increment();
        table.string("migration", 255);
        table.integer("batch");
        table
    }

    /// Creates the history table unless it exists. Returns true if it was
    /// created.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn ensure_table(&self) -> Result<bool> {
        if self.exists().await? {
            return Ok(false);
        }
        info!(table = MIGRATIONS_TABLE, "Creating migrations table");
        for statement in self.table_definition().compile().await? {
            self.db.execute(&statement).await?;
        }
        Ok(true)
    }

    /// Every applied migration, newest first.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn ran(&self) -> Result<Vec<MigrationRecord>> {
        Ok(MigrationRecord::query(&self.db)
            .order_by_desc("batch")
            .order_by_desc("id")
            .get()
            .await?)
    }

    /// Names of every applied migration, newest first.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn ran_names(&self) -> Result<Vec<String>> {
        Ok(self.ran().await?.into_iter().map(|r| r.migration).collect())
    }

    /// Filters `names` down to those not yet applied, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn pending<I, S>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ran = self.ran_names().await?;
        Ok(names
            .into_iter()
            .map(Into::into)
            .filter(|name| !ran.contains(name))
            .collect())
    }

    /// Highest batch number recorded, 0 when the history is empty.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn last_batch_number(&self) -> Result<i64> {
        Ok(MigrationRecord::query(&self.db)
            .max("batch")
            .await?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// Batch number for the next run.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn next_batch_number(&self) -> Result<i64> {
        Ok(self.last_batch_number().await? + 1)
    }

    /// Migrations of the most recent batch, newest first.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn last_batch(&self) -> Result<Vec<MigrationRecord>> {
        let batch = self.last_batch_number().await?;
        if batch == 0 {
            return Ok(Vec::new());
        }
        Ok(MigrationRecord::query(&self.db)
            .where_eq("batch", batch)
            .order_by_desc("id")
            .get()
            .await?)
    }

    /// Records `name` as applied in `batch`.
    ///
    /// # Errors
    ///
    /// Returns the driver error, or [`OrmError::InsertFailed`] if the row
    /// cannot be read back.
    pub async fn log(&self, name: &str, batch: i64) -> Result<MigrationRecord> {
        Ok(MigrationRecord::query(&self.db)
            .insert(Attributes::new().with("migration", name).with("batch", batch))
            .await?)
    }

    /// Forgets every migration of `batch`.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn delete_batch(&self, batch: i64) -> Result<u64> {
        Ok(MigrationRecord::query(&self.db)
            .where_eq("batch", batch)
            .delete()
            .await?)
    }

    /// Forgets migration `name`.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn delete(&self, name: &str) -> Result<u64> {
        Ok(MigrationRecord::query(&self.db)
            .where_eq("migration", name)
            .delete()
            .await?)
    }
}
