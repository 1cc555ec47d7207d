//! Model metadata.
//!
//! Each model type describes itself once through a [`ModelDescriptor`]. The
//! [`MetadataStore`] turns descriptors into immutable [`ModelMetadata`]
//! records, at most one per model type, which the query builder, the
//! eager loader and the migration builder consult.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use heck::ToSnakeCase;
use indexmap::IndexMap;

use crate::attributes::{Attributes, CastType};
use crate::error::{OrmError, Result};
use crate::model::Model;

/// Semantic type of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Whole number.
    Integer,
    /// Floating point or decimal number.
    Float,
    /// Text.
    String,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// JSON document.
    Json,
    /// Raw bytes.
    Binary,
}

/// A declared model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Column name.
    pub key: String,
    /// Semantic type. Fields without one are properties but not attributes.
    pub attribute_type: Option<AttributeType>,
    /// Cast applied when hydrating.
    pub cast: Option<CastType>,
}

/// Kind of relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// At most one related row.
    HasOne,
    /// Any number of related rows.
    HasMany,
}

/// A reference to another model type, resolved lazily through the store.
#[derive(Clone, Copy)]
pub struct ModelRef {
    type_id: TypeId,
    name: &'static str,
    descriptor: fn() -> ModelDescriptor,
}

impl ModelRef {
    /// Creates a reference to `M`.
    #[must_use]
    pub fn of<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: type_name::<M>(),
            descriptor: M::descriptor,
        }
    }

    /// Returns the referenced type's identity.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the referenced type's Rust name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the referenced model's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> ModelDescriptor {
        (self.descriptor)()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModelRef {}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name).finish()
    }
}

/// A declared relationship between two models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDefinition {
    /// Name the relation is loaded under.
    pub property: String,
    /// Related model.
    pub related: ModelRef,
    /// Column on the related table.
    pub foreign_key: String,
    /// Column on the declaring table.
    pub local_key: String,
    /// One or many.
    pub kind: RelationKind,
}

/// Static description of a model, supplied by [`Model::descriptor`].
///
/// # Example
///
/// ```ignore
/// ModelDescriptor::new("TestUserModel")
///     .field("username", AttributeType::String)
///     .cast_field("is_admin", AttributeType::Boolean, CastType::Bool)
///     .has_many::<TestBookModel>("books", "user_id", "id")
///     .hidden(["password"])
/// ```
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    name: String,
    table: Option<String>,
    primary_key: String,
    incrementing: bool,
    fields: Vec<FieldDefinition>,
    relationships: Vec<RelationshipDefinition>,
    visible: Vec<String>,
    hidden: Vec<String>,
}

impl ModelDescriptor {
    /// Starts a descriptor for the model called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: String::from("id"),
            incrementing: true,
            fields: Vec::new(),
            relationships: Vec::new(),
            visible: Vec::new(),
            hidden: Vec::new(),
        }
    }

    /// Overrides the derived table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Overrides the primary key column.
    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Marks the primary key as supplied by the caller rather than generated.
    #[must_use]
    pub const fn non_incrementing(mut self) -> Self {
        self.incrementing = false;
        self
    }

    /// Declares a typed attribute.
    #[must_use]
    pub fn field(self, key: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.push_field(key.into(), Some(attribute_type), None)
    }

    /// Declares a typed attribute with a cast.
    #[must_use]
    pub fn cast_field(
        self,
        key: impl Into<String>,
        attribute_type: AttributeType,
        cast: CastType,
    ) -> Self {
        self.push_field(key.into(), Some(attribute_type), Some(cast))
    }

    /// Declares an untyped property.
    #[must_use]
    pub fn property(self, key: impl Into<String>) -> Self {
        self.push_field(key.into(), None, None)
    }

    fn push_field(
        mut self,
        key: String,
        attribute_type: Option<AttributeType>,
        cast: Option<CastType>,
    ) -> Self {
        self.fields.retain(|f| f.key != key);
        self.fields.push(FieldDefinition {
            key,
            attribute_type,
            cast,
        });
        self
    }

    /// Declares a has-one relationship.
    ///
    /// `foreign_key` lives on `R`'s table, `local_key` on this model's.
    #[must_use]
    pub fn has_one<R: Model>(
        self,
        property: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        self.relationship::<R>(property, foreign_key, local_key, RelationKind::HasOne)
    }

    /// Declares a has-many relationship.
    #[must_use]
    pub fn has_many<R: Model>(
        self,
        property: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        self.relationship::<R>(property, foreign_key, local_key, RelationKind::HasMany)
    }

    fn relationship<R: Model>(
        mut self,
        property: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        self.relationships.push(RelationshipDefinition {
            property: property.into(),
            related: ModelRef::of::<R>(),
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
            kind,
        });
        self
    }

    /// Restricts serialization to these keys.
    #[must_use]
    pub fn visible<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Excludes these keys from serialization.
    #[must_use]
    pub fn hidden<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(keys.into_iter().map(Into::into));
        self
    }
}

/// Derives a table name from a model name: snake case, last word pluralized.
///
/// `TestUserModel` becomes `test_user_models`.
#[must_use]
pub fn table_name_for(model_name: &str) -> String {
    let snake = model_name.to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralizer::pluralize(last, 2, false)),
        None => pluralizer::pluralize(&snake, 2, false),
    }
}

/// Registered metadata for one model type.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    name: String,
    table: String,
    primary_key: String,
    incrementing: bool,
    fields: IndexMap<String, FieldDefinition>,
    relationships: Vec<RelationshipDefinition>,
    visible: Vec<String>,
    hidden: Vec<String>,
}

impl ModelMetadata {
    /// Builds metadata from a descriptor.
    ///
    /// An incrementing primary key is declared as an integer attribute if the
    /// descriptor does not mention it.
    #[must_use]
    pub fn from_descriptor(descriptor: ModelDescriptor) -> Self {
        let table = descriptor
            .table
            .unwrap_or_else(|| table_name_for(&descriptor.name));
        let mut fields: IndexMap<String, FieldDefinition> = IndexMap::new();
        if !descriptor.fields.iter().any(|f| f.key == descriptor.primary_key) {
            fields.insert(
                descriptor.primary_key.clone(),
                FieldDefinition {
                    key: descriptor.primary_key.clone(),
                    attribute_type: Some(AttributeType::Integer),
                    cast: None,
                },
            );
        }
        for field in descriptor.fields {
            fields.insert(field.key.clone(), field);
        }
        Self {
            name: descriptor.name,
            table,
            primary_key: descriptor.primary_key,
            incrementing: descriptor.incrementing,
            fields,
            relationships: descriptor.relationships,
            visible: descriptor.visible,
            hidden: descriptor.hidden,
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Returns true if the primary key is generated by the database.
    #[must_use]
    pub const fn is_incrementing(&self) -> bool {
        self.incrementing
    }

    /// Iterates over declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    /// Returns true if `key` is a declared field with a semantic type.
    #[must_use]
    pub fn is_attribute(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .is_some_and(|f| f.attribute_type.is_some())
    }

    /// Returns true if `key` is any declared field.
    #[must_use]
    pub fn is_property(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the relationship declared under `name`.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDefinition> {
        self.relationships.iter().find(|r| r.property == name)
    }

    /// Returns every declared relationship.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDefinition] {
        &self.relationships
    }

    /// Returns true if a relationship is declared under `name`.
    #[must_use]
    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationship(name).is_some()
    }

    /// Returns true if any relationship targets `model`.
    #[must_use]
    pub fn is_related_model(&self, model: &ModelRef) -> bool {
        self.relationship_to(model).is_some()
    }

    /// Returns the first relationship targeting `model`.
    #[must_use]
    pub fn relationship_to(&self, model: &ModelRef) -> Option<&RelationshipDefinition> {
        self.relationships.iter().find(|r| r.related == *model)
    }

    /// Returns the cast applied to `key`, if any.
    ///
    /// An incrementing primary key without an explicit cast is cast to an
    /// integer.
    #[must_use]
    pub fn cast_for(&self, key: &str) -> Option<CastType> {
        let declared = self.fields.get(key).and_then(|f| f.cast);
        if declared.is_none() && self.incrementing && key == self.primary_key {
            return Some(CastType::Int);
        }
        declared
    }

    /// Applies every declared cast to a row.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Cast`] when a value cannot be cast.
    pub fn cast_attributes(&self, attributes: Attributes) -> Result<Attributes> {
        attributes
            .into_iter()
            .map(|(key, value)| {
                let value = match self.cast_for(&key) {
                    Some(cast) => cast.apply(&key, value)?,
                    None => value,
                };
                Ok((key, value))
            })
            .collect()
    }

    /// Keys allowed in serialized output.
    #[must_use]
    pub fn is_serialized(&self, key: &str) -> bool {
        (self.visible.is_empty() || self.visible.iter().any(|k| k == key))
            && !self.hidden.iter().any(|k| k == key)
    }
}

/// Registry of model metadata, one record per model type.
///
/// The store is owned by a [`Database`](crate::Database) handle rather than
/// living in a global, so tests can use isolated registries.
#[derive(Debug, Default)]
pub struct MetadataStore {
    models: RwLock<HashMap<TypeId, Arc<ModelMetadata>>>,
}

impl MetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M`. Registering twice keeps the first record.
    pub fn register<M: Model>(&self) -> Arc<ModelMetadata> {
        self.resolve(&ModelRef::of::<M>())
    }

    /// Returns the metadata of `M`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotRegistered`] if `M` was never registered.
    pub fn get<M: Model>(&self) -> Result<Arc<ModelMetadata>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<M>())
            .cloned()
            .ok_or_else(|| OrmError::NotRegistered(type_name::<M>().to_string()))
    }

    /// Returns the metadata of `M`, registering it on first access.
    pub fn metadata<M: Model>(&self) -> Arc<ModelMetadata> {
        self.register::<M>()
    }

    /// Returns the metadata of a referenced model, registering it on first
    /// access.
    pub fn resolve(&self, model: &ModelRef) -> Arc<ModelMetadata> {
        if let Some(metadata) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&model.type_id())
        {
            return Arc::clone(metadata);
        }
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            models
                .entry(model.type_id())
                .or_insert_with(|| Arc::new(ModelMetadata::from_descriptor(model.descriptor()))),
        )
    }

    /// Returns true if `M` is registered.
    #[must_use]
    pub fn is_registered<M: Model>(&self) -> bool {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<M>())
    }

    /// Returns every registered model's metadata.
    #[must_use]
    pub fn models(&self) -> Vec<Arc<ModelMetadata>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
