//! Schema builder and migration runner for strata models.
//!
//! Migrations are Rust types implementing [`Migration`]. Each describes its
//! table changes through a [`Schema`], whose [`TableBuilder`]s compile to
//! MySQL DDL against the live database:
//!
//! - **Column types** - the MySQL type vocabulary and its rendering
//! - **Table builder** - create, alter and drop tables, columns, indexes and
//!   foreign keys; alterations skip columns the table already has
//! - **Inspector** - reads tables and columns from `information_schema`
//! - **History** - the `migrations` table, grouped into batches
//! - **Runner** - applies pending migrations, rolls back batches
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_migrate::prelude::*;
//!
//! struct CreateUsersTable;
//!
//! impl Migration for CreateUsersTable {
//!     fn name(&self) -> &str {
//!         "0001_create_users_table"
//!     }
//!
//!     fn up(&self, schema: &mut Schema) {
//!         schema.create::<User>(|table| {
//!             table.increments("id");
//!             table.string("username", 255).unique();
//!             table.boolean("is_admin").default(false);
//!             table.timestamps(0);
//!         });
//!     }
//!
//!     fn down(&self, schema: &mut Schema) {
//!         schema.drop_if_exists::<User>();
//!     }
//! }
//!
//! let runner = MigrationRunner::new(&db).migration(CreateUsersTable);
//! runner.run_up().await?;
//! ```
//!
//! # CLI Usage
//!
//! Applications hand their migrations to [`cli::run`]:
//!
//! ```bash
//! # Apply pending migrations
//! my-app-migrate migrate
//!
//! # Print the SQL instead of running it
//! my-app-migrate migrate --dry-run
//!
//! # Revert the last batch
//! my-app-migrate rollback
//!
//! # Show migration status
//! my-app-migrate status --json
//! ```

pub mod cli;
pub mod column;
pub mod column_type;
pub mod error;
pub mod history;
pub mod introspect;
pub mod runner;
pub mod table;

#[cfg(test)]
mod fixtures;

pub use column::{ColumnDefinition, DefaultValue, ForeignKeyDefinition, IndexDefinition};
pub use column_type::ColumnType;
pub use error::{MigrateError, Result};
pub use history::{MigrationRecord, MigrationRepository};
pub use introspect::{ColumnInfo, Inspector};
pub use runner::{Direction, Migration, MigrationRunner, MigrationStatus, Schema};
pub use table::TableBuilder;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::column::{ColumnDefinition, DefaultValue};
    pub use crate::column_type::ColumnType;
    pub use crate::error::{MigrateError, Result};
    pub use crate::runner::{Direction, Migration, MigrationRunner, Schema};
    pub use crate::table::TableBuilder;
}
