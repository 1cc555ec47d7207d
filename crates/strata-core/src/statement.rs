//! Parameterized statements using MySQL placeholder conventions.
//!
//! A [`Statement`] is SQL template text plus an ordered parameter list.
//! `??` consumes an identifier parameter and renders it backtick-quoted.
//! `?` consumes a value parameter: scalars become positional binds, lists
//! expand to `?, ?, ?` (an empty list renders `NULL`) and assignment lists
//! expand to `` `a` = ?, `b` = ? `` for `SET ?`.
//!
//! Placeholders inside quoted literals or quoted identifiers are left alone,
//! so inlined DDL defaults such as `DEFAULT 'why?'` survive rendering.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{Error, Result};
use crate::value::{escape_identifier, SqlValue, ToSqlValue};

/// A statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Identifier for a `??` placeholder.
    Identifier(String),
    /// Value for a `?` placeholder.
    Value(SqlValue),
    /// Column assignments for a `SET ?` placeholder.
    Assignments(Vec<(String, SqlValue)>),
}

/// SQL template text with its parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Param>,
}

/// A statement rendered for execution: identifiers quoted, values bound.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    /// SQL text containing only `?` value placeholders.
    pub sql: String,
    /// Values in placeholder order.
    pub binds: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement from template text with no parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Returns the template text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameters in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns true if the template is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// Adds an identifier parameter.
    #[must_use]
    pub fn ident(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::Identifier(name.into()));
        self
    }

    /// Adds a value parameter.
    #[must_use]
    pub fn bind(mut self, value: impl ToSqlValue) -> Self {
        self.params.push(Param::Value(value.to_sql_value()));
        self
    }

    /// Adds an assignment list parameter.
    #[must_use]
    pub fn assignments<I, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, SqlValue)>,
        K: Into<String>,
    {
        self.params.push(Param::Assignments(
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ));
        self
    }

    /// Appends template text.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends a parameter.
    pub fn push_param(&mut self, param: Param) {
        self.params.push(param);
    }

    /// Appends another statement's text and parameters.
    pub fn append(&mut self, other: Self) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    /// Returns every scalar value parameter, flattening lists and
    /// assignments, in placeholder order.
    #[must_use]
    pub fn values(&self) -> Vec<&SqlValue> {
        let mut out = Vec::new();
        for param in &self.params {
            match param {
                Param::Identifier(_) => {}
                Param::Value(value) => out.push(value),
                Param::Assignments(pairs) => out.extend(pairs.iter().map(|(_, v)| v)),
            }
        }
        out
    }

    /// Renders the statement for execution.
    ///
    /// # Errors
    ///
    /// Fails when placeholders and parameters do not line up.
    pub fn prepare(&self) -> Result<PreparedStatement> {
        let mut renderer = Renderer::new(false);
        renderer.run(&self.sql, &self.params)?;
        Ok(PreparedStatement {
            sql: renderer.out,
            binds: renderer.binds,
        })
    }

    /// Renders the statement with every value inlined as an escaped literal.
    ///
    /// Used for logging, dry runs and SQL previews.
    ///
    /// # Errors
    ///
    /// Fails when placeholders and parameters do not line up.
    pub fn to_sql_inline(&self) -> Result<String> {
        let mut renderer = Renderer::new(true);
        renderer.run(&self.sql, &self.params)?;
        Ok(renderer.out)
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_sql_inline() {
            Ok(sql) => f.write_str(&sql),
            Err(_) => f.write_str(&self.sql),
        }
    }
}

struct Renderer {
    inline: bool,
    out: String,
    binds: Vec<SqlValue>,
}

impl Renderer {
    const fn new(inline: bool) -> Self {
        Self {
            inline,
            out: String::new(),
            binds: Vec::new(),
        }
    }

    fn run(&mut self, sql: &str, params: &[Param]) -> Result<()> {
        let mut params = params.iter();
        let mut position = 0;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' | '"' | '`' => self.copy_quoted(c, &mut chars),
                '?' => {
                    let identifier = chars.peek() == Some(&'?');
                    if identifier {
                        chars.next();
                    }
                    let param = params.next().ok_or(Error::MissingParameter { position })?;
                    self.write_param(position, identifier, param)?;
                    position += 1;
                }
                c => self.out.push(c),
            }
        }

        match params.count() {
            0 => Ok(()),
            unused => Err(Error::UnusedParameters { unused }),
        }
    }

    fn copy_quoted(&mut self, quote: char, chars: &mut Peekable<Chars<'_>>) {
        self.out.push(quote);
        while let Some(c) = chars.next() {
            self.out.push(c);
            if c == '\\' && quote != '`' {
                if let Some(escaped) = chars.next() {
                    self.out.push(escaped);
                }
            } else if c == quote {
                return;
            }
        }
    }

    fn write_param(&mut self, position: usize, identifier: bool, param: &Param) -> Result<()> {
        match (identifier, param) {
            (true, Param::Identifier(name)) => self.out.push_str(&escape_identifier(name)),
            (true, _) => {
                return Err(Error::ParameterKind {
                    position,
                    expected: "an identifier",
                })
            }
            (false, Param::Identifier(_)) => {
                return Err(Error::ParameterKind {
                    position,
                    expected: "a value",
                })
            }
            (false, Param::Value(value)) => self.write_value(value),
            (false, Param::Assignments(pairs)) => {
                if pairs.is_empty() {
                    return Err(Error::EmptyAssignments);
                }
                for (i, (column, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&escape_identifier(column));
                    self.out.push_str(" = ");
                    self.write_value(value);
                }
            }
        }
        Ok(())
    }

    fn write_value(&mut self, value: &SqlValue) {
        if self.inline {
            self.out.push_str(&value.to_sql_inline());
            return;
        }
        match value {
            SqlValue::List(items) if items.is_empty() => self.out.push_str("NULL"),
            SqlValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if matches!(item, SqlValue::List(_)) {
                        self.out.push('(');
                        self.write_value(item);
                        self.out.push(')');
                    } else {
                        self.write_value(item);
                    }
                }
            }
            other => {
                self.out.push('?');
                self.binds.push(other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_identifiers_and_values() {
        let stmt = Statement::new("SELECT * FROM ?? WHERE (?? = ?)")
            .ident("users")
            .ident("username")
            .bind("sam");
        let prepared = stmt.prepare().unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM `users` WHERE (`username` = ?)");
        assert_eq!(prepared.binds, vec![SqlValue::Text("sam".into())]);
    }

    #[test]
    fn test_prepare_expands_lists() {
        let stmt = Statement::new("?? IN (?)")
            .ident("id")
            .bind(SqlValue::List(vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
            ]));
        let prepared = stmt.prepare().unwrap();
        assert_eq!(prepared.sql, "`id` IN (?, ?, ?)");
        assert_eq!(prepared.binds.len(), 3);
    }

    #[test]
    fn test_empty_list_renders_null() {
        let stmt = Statement::new("?? IN (?)")
            .ident("id")
            .bind(SqlValue::List(vec![]));
        assert_eq!(stmt.prepare().unwrap().sql, "`id` IN (NULL)");
        assert_eq!(stmt.to_sql_inline().unwrap(), "`id` IN (NULL)");
    }

    #[test]
    fn test_assignments() {
        let stmt = Statement::new("INSERT INTO ?? SET ?").ident("users").assignments([
            ("username", SqlValue::Text("sam".into())),
            ("is_admin", SqlValue::Bool(false)),
        ]);
        let prepared = stmt.prepare().unwrap();
        assert_eq!(
            prepared.sql,
            "INSERT INTO `users` SET `username` = ?, `is_admin` = ?"
        );
        assert_eq!(
            stmt.to_sql_inline().unwrap(),
            "INSERT INTO `users` SET `username` = 'sam', `is_admin` = false"
        );
    }

    #[test]
    fn test_quoted_placeholders_are_literal() {
        let stmt = Statement::new("ALTER TABLE ?? ADD ?? varchar(255) DEFAULT 'why?' not null")
            .ident("t")
            .ident("c");
        assert_eq!(
            stmt.prepare().unwrap().sql,
            "ALTER TABLE `t` ADD `c` varchar(255) DEFAULT 'why?' not null"
        );
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let stmt = Statement::new(r"SELECT 'it\'s ?', ?").bind(1);
        assert_eq!(stmt.prepare().unwrap().sql, r"SELECT 'it\'s ?', ?");
    }

    #[test]
    fn test_parameter_mismatch() {
        assert_eq!(
            Statement::new("SELECT ?").prepare().unwrap_err(),
            Error::MissingParameter { position: 0 }
        );
        assert_eq!(
            Statement::new("SELECT 1").bind(1).prepare().unwrap_err(),
            Error::UnusedParameters { unused: 1 }
        );
        assert!(matches!(
            Statement::new("SELECT ??").bind(1).prepare().unwrap_err(),
            Error::ParameterKind { .. }
        ));
        assert_eq!(
            Statement::new("SET ?")
                .assignments(Vec::<(String, SqlValue)>::new())
                .prepare()
                .unwrap_err(),
            Error::EmptyAssignments
        );
    }

    #[test]
    fn test_append_and_values() {
        let mut stmt = Statement::new("DELETE FROM ??").ident("users");
        stmt.append(Statement::new(" WHERE (?? = ?)").ident("id").bind(4));
        assert_eq!(stmt.sql(), "DELETE FROM ?? WHERE (?? = ?)");
        assert_eq!(stmt.values(), vec![&SqlValue::Int(4)]);
        assert_eq!(stmt.to_string(), "DELETE FROM `users` WHERE (`id` = 4)");
    }
}
