//! Model trait and instance operations.
//!
//! A model is a plain Rust struct that describes itself through
//! [`Model::descriptor`] and converts to and from [`Attributes`]. Hooks are
//! optional methods with pass-through defaults.

use async_trait::async_trait;
use strata_core::SqlValue;

use crate::attributes::{value_to_json, Attributes};
use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::metadata::{ModelDescriptor, ModelMetadata};
use crate::query::QueryBuilder;
use crate::relations::{HasMany, HasOne, RelationData, Relations};

/// A database model.
///
/// # Example
///
/// ```ignore
/// use strata_orm::prelude::*;
///
/// #[derive(Debug)]
/// struct User {
///     id: i64,
///     username: String,
///     relations: Relations,
/// }
///
/// impl Model for User {
///     fn descriptor() -> ModelDescriptor {
///         ModelDescriptor::new("User")
///             .field("username", AttributeType::String)
///             .has_many::<Book>("books", "user_id", "id")
///     }
///
///     fn from_attributes(attributes: &Attributes) -> Result<Self> {
///         Ok(Self {
///             id: attributes.get("id")?,
///             username: attributes.get("username")?,
///             relations: Relations::new(),
///         })
///     }
///
///     fn to_attributes(&self) -> Attributes {
///         Attributes::new().with("id", self.id).with("username", &self.username)
///     }
///
///     fn relations(&self) -> &Relations { &self.relations }
///     fn relations_mut(&mut self) -> &mut Relations { &mut self.relations }
/// }
///
/// let users = User::query(&db)
///     .where_eq("username", "sam")
///     .with("books")
///     .get()
///     .await?;
/// let books = users[0].has_many::<Book>("books")?;
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// Describes the model's table, fields and relationships.
    fn descriptor() -> ModelDescriptor;

    /// Builds an instance from a (cast) row.
    ///
    /// # Errors
    ///
    /// Returns an error when a required attribute is missing or invalid.
    fn from_attributes(attributes: &Attributes) -> Result<Self>;

    /// Returns the instance's column values.
    fn to_attributes(&self) -> Attributes;

    /// Relations loaded onto this instance.
    fn relations(&self) -> &Relations;

    /// Mutable access to the loaded relations.
    fn relations_mut(&mut self) -> &mut Relations;

    /// Called with the insert payload before it is written.
    fn before_create(attributes: Attributes) -> Attributes {
        attributes
    }

    /// Called with the re-fetched row after an insert.
    #[must_use]
    fn after_create(self) -> Self {
        self
    }

    /// Called with the update payload before it is written.
    fn before_update(attributes: Attributes) -> Attributes {
        attributes
    }

    /// Called with the refreshed instance after a model-level update.
    #[must_use]
    fn after_update(self) -> Self {
        self
    }

    /// Called before a model-level delete.
    fn before_delete(&self) {}

    /// Called after a model-level delete.
    fn after_delete(&self) {}

    /// Starts a query against this model's table.
    fn query(db: &Database) -> QueryBuilder<Self> {
        QueryBuilder::new(db)
    }

    /// Returns the loaded has-one relation `name`.
    ///
    /// Reads as empty when the relation was not eager loaded.
    ///
    /// # Errors
    ///
    /// Returns an error when a loaded row cannot be built into `R`.
    fn has_one<R: Model>(&self, name: &str) -> Result<HasOne<R>> {
        HasOne::from_data(self.relations().get(name))
    }

    /// Returns the loaded has-many relation `name`.
    ///
    /// Reads as empty when the relation was not eager loaded.
    ///
    /// # Errors
    ///
    /// Returns an error when a loaded row cannot be built into `R`.
    fn has_many<R: Model>(&self, name: &str) -> Result<HasMany<R>> {
        HasMany::from_data(self.relations().get(name))
    }

    /// Returns true if relation `name` was eager loaded onto this instance.
    fn relation_loaded(&self, name: &str) -> bool {
        self.relations().is_loaded(name)
    }

    /// Serializes the instance and its loaded relations to JSON, honoring
    /// the declared visible and hidden keys.
    fn to_json(&self) -> serde_json::Value {
        let metadata = ModelMetadata::from_descriptor(Self::descriptor());
        let mut object = serialize(&metadata, &self.to_attributes());
        for (name, data) in self.relations().iter() {
            if !metadata.is_serialized(name) {
                continue;
            }
            let related = metadata
                .relationship(name)
                .map(|r| ModelMetadata::from_descriptor(r.related.descriptor()));
            let render = |row: &Attributes| {
                related.as_ref().map_or_else(
                    || serde_json::Value::Object(row.to_json()),
                    |m| serde_json::Value::Object(serialize(m, row)),
                )
            };
            let value = match data {
                RelationData::One(row) => row.as_ref().map_or(serde_json::Value::Null, render),
                RelationData::Many(rows) => rows.iter().map(render).collect(),
            };
            object.insert(name.to_string(), value);
        }
        serde_json::Value::Object(object)
    }
}

fn serialize(
    metadata: &ModelMetadata,
    attributes: &Attributes,
) -> serde_json::Map<String, serde_json::Value> {
    attributes
        .iter()
        .filter(|(key, _)| metadata.is_serialized(key))
        .map(|(key, value)| (key.to_string(), value_to_json(value)))
        .collect()
}

/// Operations on persisted model instances.
///
/// Unlike the query builder's `update`, the model-level update re-reads the
/// row by primary key and runs `after_update` on the result.
#[async_trait]
pub trait ModelInstance: Model {
    /// Returns this instance's primary key value.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::MissingPrimaryKey`] when the key is absent or NULL.
    fn primary_key_value(&self, db: &Database) -> Result<SqlValue> {
        let metadata = db.metadata::<Self>();
        self.to_attributes()
            .value(metadata.primary_key())
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| OrmError::MissingPrimaryKey(metadata.name().to_string()))
    }

    /// Updates this row and returns the refreshed instance.
    ///
    /// Runs `before_update` on the payload and `after_update` on the result.
    ///
    /// # Errors
    ///
    /// Fails when the instance has no primary key, the update is rejected, or
    /// the row disappeared before it could be re-read.
    async fn update(&self, db: &Database, attributes: Attributes) -> Result<Self> {
        let key = self.primary_key_value(db)?;
        let metadata = db.metadata::<Self>();
        let attributes = Self::before_update(attributes);
        Self::query(db)
            .where_eq(metadata.primary_key(), key)
            .update_unhooked(attributes)
            .await?;
        let refreshed = self.refresh(db).await?;
        Ok(refreshed.after_update())
    }

    /// Deletes this row, running the delete hooks around it.
    ///
    /// Returns true if a row was removed.
    ///
    /// # Errors
    ///
    /// Fails when the instance has no primary key or the delete is rejected.
    async fn delete(&self, db: &Database) -> Result<bool> {
        let key = self.primary_key_value(db)?;
        let metadata = db.metadata::<Self>();
        self.before_delete();
        let removed = Self::query(db)
            .where_eq(metadata.primary_key(), key)
            .delete()
            .await?;
        self.after_delete();
        Ok(removed > 0)
    }

    /// Re-reads this row by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotFound`] when the row no longer exists.
    async fn refresh(&self, db: &Database) -> Result<Self> {
        let key = self.primary_key_value(db)?;
        let metadata = db.metadata::<Self>();
        Self::query(db)
            .where_eq(metadata.primary_key(), key)
            .first()
            .await?
            .ok_or(OrmError::NotFound)
    }
}

#[async_trait]
impl<M: Model> ModelInstance for M {}
