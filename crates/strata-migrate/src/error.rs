//! Error types for the migration system.

use strata_orm::OrmError;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Error from the ORM layer (driver, statement rendering, hydration).
    #[error(transparent)]
    Orm(#[from] OrmError),

    /// A migration or table definition cannot be compiled as written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A statement failed partway through a migration.
    ///
    /// Statements before it were applied; the migration was not recorded.
    #[error("Migration '{migration}' failed on `{statement}`: {source}")]
    PartialMigration {
        /// Migration name.
        migration: String,
        /// The rejected statement, rendered with inline values.
        statement: String,
        /// Driver error.
        #[source]
        source: OrmError,
    },

    /// A table's statements could not be compiled partway through a
    /// migration, typically because the live schema could not be read.
    ///
    /// Tables compiled before it were applied; the migration was not
    /// recorded.
    #[error("Migration '{migration}' failed compiling table `{table}`: {source}")]
    TableCompilation {
        /// Migration name.
        migration: String,
        /// Table whose statements could not be compiled.
        table: String,
        /// Underlying failure.
        #[source]
        source: Box<MigrateError>,
    },

    /// No migration with this name is known to the runner.
    #[error("Migration not found: {0}")]
    MigrationNotFound(String),

    /// JSON serialization error (status output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (writing SQL previews).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
