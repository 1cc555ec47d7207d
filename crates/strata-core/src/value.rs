//! SQL values and conversions.
//!
//! Values never reach SQL text through concatenation: they are either bound
//! positionally by the driver or rendered through [`SqlValue::to_sql_inline`],
//! which applies MySQL string-literal escaping.

use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};

/// A SQL value that can be bound as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value (`BIGINT UNSIGNED` columns).
    UInt(u64),
    /// Floating point or decimal value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time without time zone.
    DateTime(NaiveDateTime),
    /// Structured JSON document.
    Json(serde_json::Value),
    /// List of values, expanded to `a, b, c` when bound (used by `IN`).
    List(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns true if the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the short type name used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "unsigned int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::Json(_) => "json",
            Self::List(_) => "list",
        }
    }

    /// Returns the value as a signed integer when it holds a whole number.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::UInt(n) => i64::try_from(*n).ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Returns the value as a float when it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            #[allow(clippy::cast_precision_loss)]
            Self::UInt(n) => Some(*n as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Normalized representation used to match keys across tables.
    ///
    /// Integers of any width and numeric text compare equal, so a `BIGINT
    /// UNSIGNED` foreign key matches an `INT` primary key holding the same
    /// number. NULL never matches anything.
    #[must_use]
    pub fn match_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(n) => Some(n.to_string()),
            Self::UInt(n) => Some(n.to_string()),
            Self::Bool(b) => Some(i64::from(*b).to_string()),
            Self::Text(s) => {
                let trimmed = s.trim();
                Some(
                    trimmed
                        .parse::<i128>()
                        .map_or_else(|_| trimmed.to_string(), |n| n.to_string()),
                )
            }
            Self::Float(f) if f.fract() == 0.0 => Some(format!("{f:.0}")),
            other => Some(other.to_sql_inline()),
        }
    }

    /// Returns the MySQL literal for inline use (escaped).
    ///
    /// Prefer bound parameters; inline rendering exists for DDL defaults,
    /// where MySQL does not accept placeholders, and for logging.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "true" } else { "false" }),
            Self::Int(n) => n.to_string(),
            Self::UInt(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => escape_string(s),
            Self::Blob(b) => {
                let mut hex = String::with_capacity(b.len() * 2 + 3);
                hex.push_str("X'");
                for byte in b {
                    let _ = write!(hex, "{byte:02X}");
                }
                hex.push('\'');
                hex
            }
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Self::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
            Self::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Json(json) => escape_string(&json.to_string()),
            Self::List(items) if items.is_empty() => String::from("NULL"),
            Self::List(items) => items
                .iter()
                .map(|item| match item {
                    Self::List(_) => format!("({})", item.to_sql_inline()),
                    other => other.to_sql_inline(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Quotes a string as a MySQL literal, escaping the characters the server
/// treats specially inside single quotes.
#[must_use]
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quotes an identifier with backticks.
///
/// Dotted names are treated as qualified (`db.table` becomes
/// `` `db`.`table` ``); embedded backticks are doubled.
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

// ===== Conversions into SqlValue =====

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for &SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self.clone()
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! signed_to_sql_value {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }
        )*
    };
}

signed_to_sql_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for u64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::UInt(self)
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self)
    }
}

impl ToSqlValue for NaiveTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Time(self)
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::DateTime(self)
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Json(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

// ===== Conversions out of SqlValue =====

/// Trait for types that can be read back from a SQL value.
pub trait FromSqlValue: Sized {
    /// Converts a borrowed `SqlValue` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] when the value has an incompatible type.
    fn from_sql_value(value: &SqlValue) -> Result<Self>;
}

fn mismatch<T>(expected: &'static str, value: &SqlValue) -> Result<T> {
    Err(Error::Conversion {
        expected,
        found: value.type_name(),
    })
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value.as_i64().map_or_else(|| mismatch("int", value), Ok)
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value
            .as_i64()
            .and_then(|n| Self::try_from(n).ok())
            .map_or_else(|| mismatch("int", value), Ok)
    }
}

impl FromSqlValue for u64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::UInt(n) => Ok(*n),
            other => other
                .as_i64()
                .and_then(|n| Self::try_from(n).ok())
                .map_or_else(|| mismatch("unsigned int", value), Ok),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch("float", value), Ok)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(n) => Ok(*n != 0),
            SqlValue::UInt(n) => Ok(*n != 0),
            _ => mismatch("bool", value),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Blob(b) => {
                Self::from_utf8(b.clone()).or_else(|_| mismatch("text", value))
            }
            _ => mismatch("text", value),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Blob(b) => Ok(b.clone()),
            SqlValue::Text(s) => Ok(s.clone().into_bytes()),
            _ => mismatch("blob", value),
        }
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Date(d) => Ok(*d),
            SqlValue::DateTime(dt) => Ok(dt.date()),
            _ => mismatch("date", value),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::DateTime(dt) => Ok(*dt),
            SqlValue::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            _ => mismatch("datetime", value),
        }
    }
}

impl FromSqlValue for serde_json::Value {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Json(json) => Ok(json.clone()),
            SqlValue::Text(s) => serde_json::from_str(s).or_else(|_| mismatch("json", value)),
            _ => mismatch("json", value),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_scalars() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_sql_inline(), "true");
        assert_eq!(SqlValue::Int(-100).to_sql_inline(), "-100");
        assert_eq!(SqlValue::UInt(7).to_sql_inline(), "7");
        assert_eq!(SqlValue::Float(2.5).to_sql_inline(), "2.5");
    }

    #[test]
    fn test_inline_text_escaping() {
        assert_eq!(SqlValue::Text("it's".into()).to_sql_inline(), r"'it\'s'");
        assert_eq!(
            SqlValue::Text("a\\b\n".into()).to_sql_inline(),
            r"'a\\b\n'"
        );
    }

    #[test]
    fn test_sql_injection_prevention() {
        let value = SqlValue::Text(String::from("'; DROP TABLE users; --"));
        assert_eq!(value.to_sql_inline(), r"'\'; DROP TABLE users; --'");
    }

    #[test]
    fn test_inline_blob_and_dates() {
        assert_eq!(SqlValue::Blob(vec![0x48, 0x49]).to_sql_inline(), "X'4849'");
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(SqlValue::Date(date).to_sql_inline(), "'2024-01-31'");
        let dt = date.and_hms_opt(10, 5, 0).unwrap();
        assert_eq!(
            SqlValue::DateTime(dt).to_sql_inline(),
            "'2024-01-31 10:05:00'"
        );
    }

    #[test]
    fn test_inline_list() {
        let list = SqlValue::List(vec![SqlValue::Int(1), SqlValue::Text("a".into())]);
        assert_eq!(list.to_sql_inline(), "1, 'a'");
        assert_eq!(SqlValue::List(vec![]).to_sql_inline(), "NULL");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("users"), "`users`");
        assert_eq!(escape_identifier("app.users"), "`app`.`users`");
        assert_eq!(escape_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_match_key_normalizes_integers() {
        assert_eq!(SqlValue::Int(5).match_key(), SqlValue::UInt(5).match_key());
        assert_eq!(SqlValue::Int(5).match_key(), SqlValue::Text("5".into()).match_key());
        assert_eq!(SqlValue::Null.match_key(), None);
    }

    #[test]
    fn test_to_sql_value_conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(42_u64.to_sql_value(), SqlValue::UInt(42));
        assert_eq!("hello".to_sql_value(), SqlValue::Text(String::from("hello")));
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
    }

    #[test]
    fn test_from_sql_value_conversions() {
        assert_eq!(i64::from_sql_value(&SqlValue::UInt(3)).unwrap(), 3);
        assert!(bool::from_sql_value(&SqlValue::Int(1)).unwrap());
        assert_eq!(
            Option::<String>::from_sql_value(&SqlValue::Null).unwrap(),
            None
        );
        let err = i64::from_sql_value(&SqlValue::Text("abc".into())).unwrap_err();
        assert!(matches!(err, Error::Conversion { expected: "int", .. }));
    }
}
