//! Scripted in-memory driver.
//!
//! Every statement is logged. Responses are consumed in order from a queue;
//! when the queue is empty `execute` reports zero affected rows and `fetch`
//! returns no rows. Used by the test suites and for previewing SQL without
//! a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use strata_core::Statement;

use super::{Driver, ExecResult};
use crate::attributes::Attributes;
use crate::error::{OrmError, Result};

/// A scripted driver answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Answer to the next `execute`.
    Exec(ExecResult),
    /// Answer to the next `fetch`.
    Rows(Vec<Attributes>),
    /// Failure for the next statement of either kind.
    Error(String),
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<Statement>,
    responses: VecDeque<Response>,
}

/// Driver that records statements and replays scripted responses.
///
/// Clones share the same log and script.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    state: Arc<Mutex<State>>,
}

impl RecordingDriver {
    /// Creates a driver with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a response.
    pub fn push(&self, response: Response) {
        self.state().responses.push_back(response);
    }

    /// Queues rows for the next `fetch`.
    pub fn push_rows(&self, rows: Vec<Attributes>) {
        self.push(Response::Rows(rows));
    }

    /// Queues an execute result.
    pub fn push_exec(&self, result: ExecResult) {
        self.push(Response::Exec(result));
    }

    /// Queues a failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Response::Error(message.into()));
    }

    /// Returns every statement received so far.
    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    /// Returns every statement received so far, rendered with inline values.
    #[must_use]
    pub fn sql_log(&self) -> Vec<String> {
        self.state()
            .statements
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Returns the number of scripted responses not yet consumed.
    #[must_use]
    pub fn pending_responses(&self) -> usize {
        self.state().responses.len()
    }

    /// Clears the statement log.
    pub fn clear(&self) {
        self.state().statements.clear();
    }

    fn next(&self, statement: &Statement) -> Option<Response> {
        let mut state = self.state();
        state.statements.push(statement.clone());
        state.responses.pop_front()
    }
}

fn scripted_error(message: String) -> OrmError {
    OrmError::Database(sqlx::Error::Protocol(message))
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn execute(&self, statement: &Statement) -> Result<ExecResult> {
        statement.prepare()?;
        match self.next(statement) {
            Some(Response::Exec(result)) => Ok(result),
            Some(Response::Rows(rows)) => Ok(ExecResult::affected(rows.len() as u64)),
            Some(Response::Error(message)) => Err(scripted_error(message)),
            None => Ok(ExecResult::default()),
        }
    }

    async fn fetch(&self, statement: &Statement) -> Result<Vec<Attributes>> {
        statement.prepare()?;
        match self.next(statement) {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Exec(_)) | None => Ok(Vec::new()),
            Some(Response::Error(message)) => Err(scripted_error(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_replays() {
        let driver = RecordingDriver::new();
        driver.push_exec(ExecResult::inserted(1, 9));
        driver.push_rows(vec![Attributes::new().with("id", 9_i64)]);

        let insert = Statement::new("INSERT INTO ?? SET ?")
            .ident("users")
            .assignments([("username", strata_core::SqlValue::Text("sam".into()))]);
        let result = driver.execute(&insert).await.unwrap();
        assert_eq!(result.last_insert_id, Some(9));

        let rows = driver
            .fetch(&Statement::new("SELECT * FROM ??").ident("users"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            driver.sql_log(),
            [
                "INSERT INTO `users` SET `username` = 'sam'",
                "SELECT * FROM `users`"
            ]
        );
        assert_eq!(driver.pending_responses(), 0);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let driver = RecordingDriver::new();
        driver.push_error("duplicate column");
        let err = driver.execute(&Statement::new("ALTER TABLE x")).await.unwrap_err();
        assert!(matches!(err, OrmError::Database(_)));
    }

    #[tokio::test]
    async fn test_malformed_statement_is_rejected() {
        let driver = RecordingDriver::new();
        let err = driver.fetch(&Statement::new("SELECT ??")).await.unwrap_err();
        assert!(matches!(err, OrmError::Statement(_)));
        assert!(driver.statements().is_empty());
    }
}
