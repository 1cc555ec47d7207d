//! Database driver boundary.
//!
//! The ORM hands a driver fully parameterized [`Statement`]s and gets back
//! either an [`ExecResult`] or rows as [`Attributes`]. [`MySqlDriver`] talks
//! to a server through sqlx; [`RecordingDriver`] answers from a script and
//! keeps a log of what it was asked to run.

mod mysql;
mod recording;

use std::fmt::Debug;

use async_trait::async_trait;
use strata_core::Statement;

use crate::attributes::Attributes;
use crate::error::Result;

pub use mysql::{DatabaseOptions, MySqlDriver};
pub use recording::{RecordingDriver, Response};

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Generated key of the last inserted row, if any.
    pub last_insert_id: Option<u64>,
}

impl ExecResult {
    /// Creates a result reporting `rows_affected` rows and no generated key.
    #[must_use]
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    /// Creates an insert result with a generated key.
    #[must_use]
    pub const fn inserted(rows_affected: u64, last_insert_id: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: Some(last_insert_id),
        }
    }
}

/// Executes statements against a database.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Executes a statement that returns no rows.
    async fn execute(&self, statement: &Statement) -> Result<ExecResult>;

    /// Executes a statement and returns its rows.
    async fn fetch(&self, statement: &Statement) -> Result<Vec<Attributes>>;
}
