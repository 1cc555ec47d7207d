//! # strata-orm
//!
//! An active-record style ORM for MySQL.
//!
//! This crate provides:
//! - `Model` trait describing a table, its casts and its relationships
//! - `MetadataStore` holding one metadata record per model type
//! - `QueryBuilder` for chainable predicates, mutations and aggregates
//! - Eager loading of has-one and has-many relationships
//! - A `Driver` boundary with a sqlx MySQL driver and a recording driver
//!
//! ## Quick Start
//!
//! ```ignore
//! use strata_orm::prelude::*;
//!
//! async fn example(db: &Database) -> strata_orm::Result<()> {
//!     // Insert, then read back with generated columns filled in
//!     let user = User::query(db)
//!         .insert(Attributes::new().with("username", "sam"))
//!         .await?;
//!
//!     // Update every match, returning the affected count
//!     let updated = User::query(db)
//!         .where_eq("username", "sam")
//!         .update(Attributes::new().with("is_admin", true))
//!         .await?;
//!
//!     // Eager load a relationship with one extra query
//!     let users = User::query(db).with("books").get().await?;
//!     let books = users[0].has_many::<Book>("books")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Predicates
//!
//! Predicates land in an AND group or an OR group; each group renders as a
//! parenthesized conjunction:
//!
//! ```ignore
//! // WHERE (`a` = 1 AND `b` = 2) OR (`c` = 3)
//! User::query(db).where_eq("a", 1).where_eq("b", 2).or_where("c", 3);
//! ```

mod attributes;
mod database;
pub mod driver;
mod error;
mod metadata;
mod model;
pub mod query;
mod relations;

#[cfg(test)]
mod fixtures;

pub use attributes::{value_to_json, Attributes, CastType};
pub use database::Database;
pub use driver::{DatabaseOptions, Driver, ExecResult, MySqlDriver, RecordingDriver};
pub use error::{OrmError, Result};
pub use metadata::{
    table_name_for, AttributeType, FieldDefinition, MetadataStore, ModelDescriptor,
    ModelMetadata, ModelRef, RelationKind, RelationshipDefinition,
};
pub use model::{Model, ModelInstance};
pub use query::{Aggregate, Operator, OrderDirection, QueryBuilder};
pub use relations::{HasMany, HasOne, RelationData, Relations};

// Re-export commonly used types from strata-core
pub use strata_core::{FromSqlValue, SqlValue, Statement, ToSqlValue};

/// Imports needed to declare and query models.
pub mod prelude {
    pub use crate::{
        AttributeType, Attributes, CastType, Database, HasMany, HasOne, Model, ModelDescriptor,
        ModelInstance, Operator, OrderDirection, Relations, Result,
    };
}
