//! Loaded relations and typed relation accessors.
//!
//! The eager loader stores related rows on each parent as [`RelationData`].
//! [`HasOne`] and [`HasMany`] build the related models from those rows and
//! read as empty when nothing was loaded.

use std::ops::Deref;

use indexmap::IndexMap;

use crate::attributes::Attributes;
use crate::database::Database;
use crate::error::Result;
use crate::model::Model;
use crate::query::QueryBuilder;

/// Rows loaded for one relation of one parent.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationData {
    /// Has-one result: the first matching row, if any.
    One(Option<Attributes>),
    /// Has-many result: every matching row.
    Many(Vec<Attributes>),
}

/// Relations loaded onto a model instance, keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations(IndexMap<String, RelationData>);

impl Relations {
    /// Creates an empty relation set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores loaded data, replacing any previous data for `name`.
    pub fn insert(&mut self, name: impl Into<String>, data: RelationData) {
        self.0.insert(name.into(), data);
    }

    /// Returns the data loaded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RelationData> {
        self.0.get(name)
    }

    /// Returns true if `name` was loaded.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over loaded relations.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationData)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of loaded relations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accessor for a has-one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum HasOne<R> {
    /// The relation was not eager loaded.
    NotLoaded,
    /// The loaded related model, if a row matched.
    Loaded(Option<R>),
}

impl<R: Model> HasOne<R> {
    /// Builds the accessor from stored relation data.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored row cannot be built into `R`.
    pub fn from_data(data: Option<&RelationData>) -> Result<Self> {
        let row = match data {
            None => return Ok(Self::NotLoaded),
            Some(RelationData::One(row)) => row.as_ref(),
            Some(RelationData::Many(rows)) => rows.first(),
        };
        row.map(R::from_attributes).transpose().map(Self::Loaded)
    }

    /// Returns the related model, or `None` if absent or not loaded.
    #[must_use]
    pub const fn get(&self) -> Option<&R> {
        match self {
            Self::Loaded(Some(model)) => Some(model),
            _ => None,
        }
    }

    /// Returns true if the relation was eager loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Consumes the accessor, returning the related model.
    #[must_use]
    pub fn into_inner(self) -> Option<R> {
        match self {
            Self::Loaded(model) => model,
            Self::NotLoaded => None,
        }
    }

    /// Starts a query against the related table.
    ///
    /// The query is not scoped to the parent; add the join predicate
    /// yourself.
    #[must_use]
    pub fn query(&self, db: &Database) -> QueryBuilder<R> {
        R::query(db)
    }
}

/// Accessor for a has-many relation. Dereferences to a slice of the related
/// models, empty when the relation was not loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum HasMany<R> {
    /// The relation was not eager loaded.
    NotLoaded,
    /// The loaded related models.
    Loaded(Vec<R>),
}

impl<R: Model> HasMany<R> {
    /// Builds the accessor from stored relation data.
    ///
    /// # Errors
    ///
    /// Returns an error when a stored row cannot be built into `R`.
    pub fn from_data(data: Option<&RelationData>) -> Result<Self> {
        let rows: Vec<&Attributes> = match data {
            None => return Ok(Self::NotLoaded),
            Some(RelationData::One(row)) => row.iter().collect(),
            Some(RelationData::Many(rows)) => rows.iter().collect(),
        };
        rows.into_iter()
            .map(R::from_attributes)
            .collect::<Result<Vec<_>>>()
            .map(Self::Loaded)
    }

    /// Returns true if the relation was eager loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Consumes the accessor, returning the related models.
    #[must_use]
    pub fn into_vec(self) -> Vec<R> {
        match self {
            Self::Loaded(models) => models,
            Self::NotLoaded => Vec::new(),
        }
    }

    /// Starts a query against the related table.
    ///
    /// The query is not scoped to the parent; add the join predicate
    /// yourself.
    #[must_use]
    pub fn query(&self, db: &Database) -> QueryBuilder<R> {
        R::query(db)
    }
}

impl<R> Deref for HasMany<R> {
    type Target = [R];

    fn deref(&self) -> &[R] {
        match self {
            Self::Loaded(models) => models,
            Self::NotLoaded => &[],
        }
    }
}
