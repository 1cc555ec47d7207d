//! Predicates, ordering and statement compilation.
//!
//! [`RawQuery`] is the untyped state behind a query builder: one table, a
//! statement kind, predicate bindings, ordering and a limit. It compiles to
//! a single [`Statement`] and is shared by the typed builder and the eager
//! loader.

use std::fmt;
use std::str::FromStr;

use strata_core::{SqlValue, Statement};

use crate::attributes::Attributes;
use crate::error::Result;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `IN`
    In,
}

impl Operator {
    /// Returns the SQL operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::In => "IN",
        }
    }
}

/// Predicate group. Each group renders as one parenthesized conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Rendered first.
    And,
    /// Rendered after `OR`.
    Or,
}

/// A single predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Column the predicate applies to.
    pub column: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Compared value. Always a list for [`Operator::In`].
    pub value: SqlValue,
    /// Group the predicate belongs to.
    pub group: Group,
}

impl Binding {
    /// Creates a binding, wrapping scalar `IN` values in a list.
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: SqlValue, group: Group) -> Self {
        let value = match (operator, value) {
            (Operator::In, list @ SqlValue::List(_)) => list,
            (Operator::In, scalar) => SqlValue::List(vec![scalar]),
            (_, value) => value,
        };
        Self {
            column: column.into(),
            operator,
            value,
            group,
        }
    }

    fn render(&self) -> Statement {
        let sql = match self.operator {
            Operator::In => String::from("?? IN (?)"),
            op => format!("?? {} ?", op.as_sql()),
        };
        Statement::new(sql)
            .ident(self.column.as_str())
            .bind(self.value.clone())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(format!("invalid order direction: {s}"))
        }
    }
}

/// An ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// Kind of statement a query compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryKind {
    /// `SELECT * FROM ...`
    #[default]
    Select,
    /// `INSERT INTO ... SET ...`
    Insert,
    /// `UPDATE ... SET ...`
    Update,
    /// `DELETE FROM ...`
    Delete,
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `COUNT`
    Count,
}

impl Aggregate {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function())
    }
}

/// Untyped query state for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    /// Target table.
    pub table: String,
    /// Statement kind.
    pub kind: QueryKind,
    /// Predicates in insertion order.
    pub bindings: Vec<Binding>,
    /// Ordering terms in call order.
    pub orders: Vec<OrderBy>,
    /// Row cap.
    pub limit: Option<u64>,
    /// Insert or update payload.
    pub payload: Attributes,
}

impl RawQuery {
    /// Creates a SELECT against `table`.
    #[must_use]
    pub fn select(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Appends a predicate.
    pub fn push_binding(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Compiles the query.
    ///
    /// `ORDER BY` and `LIMIT` are only emitted for SELECT; predicates are
    /// ignored for INSERT.
    ///
    /// # Errors
    ///
    /// Returns [`strata_core::Error::EmptyAssignments`] for an INSERT or
    /// UPDATE without a payload.
    pub fn compile(&self) -> Result<Statement> {
        let mut statement = match self.kind {
            QueryKind::Select => Statement::new("SELECT * FROM ??").ident(self.table.as_str()),
            QueryKind::Insert => {
                self.require_payload()?;
                return Ok(Statement::new("INSERT INTO ?? SET ?")
                    .ident(self.table.as_str())
                    .assignments(self.payload.clone()));
            }
            QueryKind::Update => {
                self.require_payload()?;
                let mut statement = Statement::new("UPDATE ?? SET ").ident(self.table.as_str());
                for (i, (column, value)) in self.payload.iter().enumerate() {
                    if i > 0 {
                        statement.push_sql(", ");
                    }
                    statement.append(Statement::new("?? = ?").ident(column).bind(value));
                }
                statement
            }
            QueryKind::Delete => Statement::new("DELETE FROM ??").ident(self.table.as_str()),
        };

        statement.append(self.where_clause());

        if self.kind == QueryKind::Select {
            statement.append(self.order_clause());
            if let Some(limit) = self.limit {
                statement.append(Statement::new(" LIMIT ?").bind(limit));
            }
        }

        Ok(statement)
    }

    /// Compiles `SELECT FN(col) AS aggregate FROM table [WHERE ...]`.
    ///
    /// Accumulated predicates apply; ordering and limit do not. Without a
    /// column the aggregate runs over `*`.
    #[must_use]
    pub fn compile_aggregate(&self, aggregate: Aggregate, column: Option<&str>) -> Statement {
        let mut statement = match column {
            Some(column) => Statement::new(format!(
                "SELECT {}(??) AS aggregate FROM ??",
                aggregate.function()
            ))
            .ident(column),
            None => Statement::new(format!(
                "SELECT {}(*) AS aggregate FROM ??",
                aggregate.function()
            )),
        }
        .ident(self.table.as_str());
        statement.append(self.where_clause());
        statement
    }

    fn require_payload(&self) -> Result<()> {
        if self.payload.is_empty() {
            return Err(strata_core::Error::EmptyAssignments.into());
        }
        Ok(())
    }

    /// Renders ` WHERE (and-group) OR (or-group)`, or nothing without
    /// predicates.
    fn where_clause(&self) -> Statement {
        let and = self.group(Group::And);
        let or = self.group(Group::Or);
        let mut clause = Statement::default();
        match (and, or) {
            (None, None) => {}
            (Some(group), None) | (None, Some(group)) => {
                clause.push_sql(" WHERE ");
                clause.append(group);
            }
            (Some(and), Some(or)) => {
                clause.push_sql(" WHERE ");
                clause.append(and);
                clause.push_sql(" OR ");
                clause.append(or);
            }
        }
        clause
    }

    fn group(&self, group: Group) -> Option<Statement> {
        let mut members = self.bindings.iter().filter(|b| b.group == group).peekable();
        members.peek()?;
        let mut statement = Statement::new("(");
        for (i, binding) in members.enumerate() {
            if i > 0 {
                statement.push_sql(" AND ");
            }
            statement.append(binding.render());
        }
        statement.push_sql(")");
        Some(statement)
    }

    fn order_clause(&self) -> Statement {
        let mut clause = Statement::default();
        for (i, order) in self.orders.iter().enumerate() {
            clause.push_sql(if i == 0 { " ORDER BY " } else { ", " });
            clause.append(
                Statement::new(format!("?? {}", order.direction.as_sql()))
                    .ident(order.column.as_str()),
            );
        }
        clause
    }
}
