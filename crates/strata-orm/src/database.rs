//! Shared database handle.

use std::sync::Arc;

use strata_core::Statement;
use tracing::debug;

use crate::attributes::Attributes;
use crate::driver::{DatabaseOptions, Driver, ExecResult, MySqlDriver};
use crate::error::Result;
use crate::metadata::{MetadataStore, ModelMetadata};
use crate::model::Model;

/// A driver paired with the metadata store its queries consult.
///
/// Cloning is cheap; clones share the driver and the store.
#[derive(Debug, Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
    models: Arc<MetadataStore>,
}

impl Database {
    /// Wraps a driver with a fresh metadata store.
    pub fn new(driver: impl Driver) -> Self {
        Self::with_store(Arc::new(driver), Arc::new(MetadataStore::new()))
    }

    /// Wraps a shared driver and store.
    #[must_use]
    pub fn with_store(driver: Arc<dyn Driver>, models: Arc<MetadataStore>) -> Self {
        Self { driver, models }
    }

    /// Connects to MySQL.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the connection cannot be established.
    pub async fn connect(options: &DatabaseOptions) -> Result<Self> {
        Ok(Self::new(MySqlDriver::connect_with(options).await?))
    }

    /// Returns the driver.
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Returns the metadata store.
    #[must_use]
    pub fn models(&self) -> &MetadataStore {
        &self.models
    }

    /// Registers `M` with the metadata store.
    pub fn register<M: Model>(&self) -> Arc<ModelMetadata> {
        self.models.register::<M>()
    }

    /// Returns the metadata of `M`, registering it on first access.
    #[must_use]
    pub fn metadata<M: Model>(&self) -> Arc<ModelMetadata> {
        self.models.metadata::<M>()
    }

    /// Executes a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn execute(&self, statement: &Statement) -> Result<ExecResult> {
        debug!(sql = %statement, "execute");
        self.driver.execute(statement).await
    }

    /// Executes a statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns the driver error.
    pub async fn fetch(&self, statement: &Statement) -> Result<Vec<Attributes>> {
        debug!(sql = %statement, "fetch");
        self.driver.fetch(statement).await
    }
}
