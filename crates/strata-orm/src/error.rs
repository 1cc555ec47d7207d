//! Error types for the ORM.

use thiserror::Error;

/// ORM-specific errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement could not be rendered.
    #[error("statement error: {0}")]
    Statement(#[from] strata_core::Error),

    /// Metadata was requested for a model that was never registered.
    #[error("model not registered: {0}")]
    NotRegistered(String),

    /// An insert reported no affected rows, or the inserted row could not be
    /// read back.
    #[error("insert into `{0}` failed")]
    InsertFailed(String),

    /// No row found matching the query.
    #[error("object not found")]
    NotFound,

    /// A model instance has no primary key value.
    #[error("model `{0}` has no primary key value")]
    MissingPrimaryKey(String),

    /// An attribute required to build a model was absent from the row.
    #[error("missing attribute `{0}`")]
    MissingAttribute(String),

    /// An attribute held a value of the wrong type.
    #[error("invalid attribute `{key}`: {reason}")]
    InvalidAttribute {
        /// Attribute key.
        key: String,
        /// Conversion failure.
        reason: String,
    },

    /// A row could not be turned into a model instance.
    #[error("cannot hydrate `{model}`: {source}")]
    Hydrate {
        /// Model name.
        model: String,
        /// Underlying failure.
        #[source]
        source: Box<OrmError>,
    },

    /// A cast name was not recognized.
    #[error("unknown cast type: {0}")]
    UnknownCast(String),

    /// A declared cast could not be applied.
    #[error("cannot cast `{key}` as {cast}: {reason}")]
    Cast {
        /// Attribute key.
        key: String,
        /// Cast name.
        cast: &'static str,
        /// Failure details.
        reason: String,
    },

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
