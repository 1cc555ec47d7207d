//! # strata-core
//!
//! SQL values and parameterized statements for the MySQL dialect.
//!
//! Statements follow the MySQL client convention of `??` for identifiers
//! and `?` for values:
//!
//! ```rust
//! use strata_core::{SqlValue, Statement};
//!
//! let stmt = Statement::new("SELECT * FROM ?? WHERE (?? IN (?))")
//!     .ident("users")
//!     .ident("id")
//!     .bind(SqlValue::List(vec![SqlValue::Int(1), SqlValue::Int(2)]));
//!
//! let prepared = stmt.prepare().unwrap();
//! assert_eq!(prepared.sql, "SELECT * FROM `users` WHERE (`id` IN (?, ?))");
//! assert_eq!(
//!     stmt.to_sql_inline().unwrap(),
//!     "SELECT * FROM `users` WHERE (`id` IN (1, 2))"
//! );
//! ```

pub mod error;
pub mod statement;
pub mod value;

pub use error::{Error, Result};
pub use statement::{Param, PreparedStatement, Statement};
pub use value::{escape_identifier, escape_string, FromSqlValue, SqlValue, ToSqlValue};
