//! Typed query builder.
//!
//! A [`QueryBuilder`] starts as a SELECT and accumulates predicates,
//! ordering, a limit and eager-load requests. `insert`, `update` and
//! `delete` consume the builder, so each builder compiles to exactly one
//! statement.
//!
//! # Example
//!
//! ```ignore
//! let latest = User::query(&db)
//!     .where_eq("username", "sam")
//!     .order_by_desc("id")
//!     .first()
//!     .await?;
//!
//! let promoted = User::query(&db)
//!     .where_in("id", [1, 2, 3])
//!     .update(Attributes::new().with("is_admin", true))
//!     .await?;
//! ```

mod clause;
mod eager;

use std::marker::PhantomData;
use std::sync::Arc;

use strata_core::{SqlValue, Statement, ToSqlValue};
use tracing::{debug, warn};

pub use clause::{
    Aggregate, Binding, Group, Operator, OrderBy, OrderDirection, QueryKind, RawQuery,
};

use crate::attributes::Attributes;
use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::metadata::ModelMetadata;
use crate::model::Model;

/// Fluent query against one model's table.
pub struct QueryBuilder<M: Model> {
    db: Database,
    metadata: Arc<ModelMetadata>,
    raw: RawQuery,
    eager: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            metadata: Arc::clone(&self.metadata),
            raw: self.raw.clone(),
            eager: self.eager.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for QueryBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("model", &self.metadata.name())
            .field("raw", &self.raw)
            .field("eager", &self.eager)
            .finish()
    }
}

impl<M: Model> QueryBuilder<M> {
    /// Starts a SELECT against `M`'s table.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        let metadata = db.metadata::<M>();
        Self {
            db: db.clone(),
            raw: RawQuery::select(metadata.table()),
            metadata,
            eager: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Returns the model's metadata.
    #[must_use]
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Returns the accumulated query state.
    #[must_use]
    pub const fn raw(&self) -> &RawQuery {
        &self.raw
    }

    fn push(mut self, column: impl Into<String>, op: Operator, value: SqlValue, group: Group) -> Self {
        self.raw.push_binding(Binding::new(column, op, value, group));
        self
    }

    // ===== Predicates =====

    /// Adds `column = value` to the AND group.
    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.push(column, Operator::Eq, value.to_sql_value(), Group::And)
    }

    /// Adds `column <op> value` to the AND group.
    #[must_use]
    pub fn where_op(self, column: impl Into<String>, op: Operator, value: impl ToSqlValue) -> Self {
        self.push(column, op, value.to_sql_value(), Group::And)
    }

    /// Adds `column = value` to the OR group.
    #[must_use]
    pub fn or_where(self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.push(column, Operator::Eq, value.to_sql_value(), Group::Or)
    }

    /// Adds `column <op> value` to the OR group.
    #[must_use]
    pub fn or_where_op(self, column: impl Into<String>, op: Operator, value: impl ToSqlValue) -> Self {
        self.push(column, op, value.to_sql_value(), Group::Or)
    }

    /// Adds `column IN (values)` to the AND group.
    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        let list = SqlValue::List(values.into_iter().map(ToSqlValue::to_sql_value).collect());
        self.push(column, Operator::In, list, Group::And)
    }

    // ===== Ordering, limit, eager loading =====

    /// Appends an ordering term.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.raw.orders.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    /// Appends an ascending ordering term.
    #[must_use]
    pub fn order_by_asc(self, column: impl Into<String>) -> Self {
        self.order_by(column, OrderDirection::Asc)
    }

    /// Appends a descending ordering term.
    #[must_use]
    pub fn order_by_desc(self, column: impl Into<String>) -> Self {
        self.order_by(column, OrderDirection::Desc)
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub const fn take(mut self, limit: u64) -> Self {
        self.raw.limit = Some(limit);
        self
    }

    /// Requests eager loading of a declared relationship.
    ///
    /// Undeclared names are ignored.
    #[must_use]
    pub fn with(mut self, relation: &str) -> Self {
        if !self.metadata.has_relationship(relation) {
            debug!(
                model = %self.metadata.name(),
                relation = %relation,
                "ignoring eager load of undeclared relation"
            );
        } else if !self.eager.iter().any(|r| r == relation) {
            self.eager.push(relation.to_string());
        }
        self
    }

    /// Returns the relations requested for eager loading.
    #[must_use]
    pub fn eager_loads(&self) -> &[String] {
        &self.eager
    }

    /// Compiles the current query without executing it.
    ///
    /// # Errors
    ///
    /// Fails for an INSERT or UPDATE state without a payload.
    pub fn to_statement(&self) -> Result<Statement> {
        self.raw.compile()
    }

    // ===== Reads =====

    /// Runs the SELECT and hydrates every row, then resolves requested
    /// relations with one query each.
    ///
    /// # Errors
    ///
    /// Returns driver errors and hydration failures.
    pub async fn get(self) -> Result<Vec<M>> {
        let statement = self.raw.compile()?;
        let rows = self.db.fetch(&statement).await?;

        let mut models = Vec::with_capacity(rows.len());
        let mut cast_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let row = self.cast(row)?;
            models.push(M::from_attributes(&row).map_err(|e| self.hydrate_error(e))?);
            cast_rows.push(row);
        }

        if !self.eager.is_empty() && !models.is_empty() {
            let loaded = eager::load(&self.db, &self.metadata, &cast_rows, &self.eager).await?;
            for (name, data) in loaded {
                for (model, data) in models.iter_mut().zip(data) {
                    model.relations_mut().insert(name.as_str(), data);
                }
            }
        }

        Ok(models)
    }

    /// Returns the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns driver errors and hydration failures.
    pub async fn first(self) -> Result<Option<M>> {
        Ok(self.take(1).get().await?.into_iter().next())
    }

    fn cast(&self, row: Attributes) -> Result<Attributes> {
        self.metadata
            .cast_attributes(row)
            .map_err(|e| self.hydrate_error(e))
    }

    fn hydrate_error(&self, source: OrmError) -> OrmError {
        OrmError::Hydrate {
            model: self.metadata.name().to_string(),
            source: Box::new(source),
        }
    }

    // ===== Mutations =====

    /// Inserts a row and returns it re-read by its generated key.
    ///
    /// `before_create` may rewrite the payload; `after_create` runs on the
    /// hydrated result. Keys naming relationships are dropped from the
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::InsertFailed`] when no row was inserted or the
    /// inserted row cannot be read back.
    pub async fn insert(self, attributes: Attributes) -> Result<M> {
        let mut attributes = M::before_create(attributes);
        for relationship in self.metadata.relationships() {
            if attributes.remove(&relationship.property).is_some() {
                debug!(
                    model = %self.metadata.name(),
                    relation = %relationship.property,
                    "dropping relation key from insert payload"
                );
            }
        }

        let table = self.metadata.table().to_string();
        let primary_key = self.metadata.primary_key().to_string();
        let supplied_key = attributes
            .value(&primary_key)
            .filter(|v| !v.is_null())
            .cloned();

        let mut raw = self.raw;
        raw.kind = QueryKind::Insert;
        raw.payload = attributes;
        let result = self.db.execute(&raw.compile()?).await?;

        if result.rows_affected == 0 {
            warn!(table = %table, "insert affected no rows");
            return Err(OrmError::InsertFailed(table));
        }

        let key = match (self.metadata.is_incrementing(), result.last_insert_id) {
            (true, Some(id)) => Some(SqlValue::UInt(id)),
            _ => supplied_key,
        }
        .ok_or_else(|| OrmError::InsertFailed(table.clone()))?;

        let model = M::query(&self.db)
            .where_eq(primary_key, key)
            .first()
            .await?
            .ok_or(OrmError::InsertFailed(table))?;

        Ok(model.after_create())
    }

    /// Updates every matching row and returns the number affected.
    ///
    /// Runs `before_update` on the payload. `after_update` is not run: the
    /// matched rows are not re-read. Use the model-level update for that.
    ///
    /// # Errors
    ///
    /// Returns driver errors, or a statement error for an empty payload.
    pub async fn update(self, attributes: Attributes) -> Result<u64> {
        let attributes = M::before_update(attributes);
        self.update_unhooked(attributes).await
    }

    pub(crate) async fn update_unhooked(self, attributes: Attributes) -> Result<u64> {
        let mut raw = self.raw;
        raw.kind = QueryKind::Update;
        raw.payload = attributes;
        Ok(self.db.execute(&raw.compile()?).await?.rows_affected)
    }

    /// Deletes every matching row and returns the number removed.
    ///
    /// No hooks run; the model-level delete wraps them around this.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn delete(self) -> Result<u64> {
        let mut raw = self.raw;
        raw.kind = QueryKind::Delete;
        Ok(self.db.execute(&raw.compile()?).await?.rows_affected)
    }

    // ===== Aggregates =====

    async fn aggregate(&self, aggregate: Aggregate, column: Option<&str>) -> Result<SqlValue> {
        let statement = self.raw.compile_aggregate(aggregate, column);
        let rows = self.db.fetch(&statement).await?;
        Ok(rows
            .first()
            .and_then(|row| row.value("aggregate"))
            .cloned()
            .unwrap_or(SqlValue::Null))
    }

    /// Smallest value of `column` among matching rows.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn min(&self, column: &str) -> Result<Option<SqlValue>> {
        let value = self.aggregate(Aggregate::Min, Some(column)).await?;
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    /// Largest value of `column` among matching rows.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn max(&self, column: &str) -> Result<Option<SqlValue>> {
        let value = self.aggregate(Aggregate::Max, Some(column)).await?;
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    /// Sum of `column` among matching rows.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn sum(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.aggregate(Aggregate::Sum, Some(column)).await?.as_f64())
    }

    /// Average of `column` among matching rows.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn avg(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.aggregate(Aggregate::Avg, Some(column)).await?.as_f64())
    }

    /// Number of matching rows where `column` is not NULL.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn count(&self, column: &str) -> Result<i64> {
        Ok(self
            .aggregate(Aggregate::Count, Some(column))
            .await?
            .as_i64()
            .unwrap_or(0))
    }

    /// Number of matching rows.
    ///
    /// # Errors
    ///
    /// Returns driver errors.
    pub async fn count_all(&self) -> Result<i64> {
        Ok(self
            .aggregate(Aggregate::Count, None)
            .await?
            .as_i64()
            .unwrap_or(0))
    }
}
