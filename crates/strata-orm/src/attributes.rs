//! Attribute maps and attribute casting.
//!
//! Rows travel through the ORM as [`Attributes`]: an insertion-ordered map
//! from column name to [`SqlValue`]. Declared [`CastType`]s normalize the
//! raw driver values (for example `tinyint` 0/1 into booleans) before a
//! model is built from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use strata_core::{FromSqlValue, SqlValue, ToSqlValue};

use crate::error::{OrmError, Result};

/// An ordered set of column values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(IndexMap<String, SqlValue>);

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value and returns the map, for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToSqlValue) -> Option<SqlValue> {
        self.0.insert(key.into(), value.to_sql_value())
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&SqlValue> {
        self.0.get(key)
    }

    /// Reads a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::MissingAttribute`] when the key is absent and
    /// [`OrmError::InvalidAttribute`] when the value cannot be converted.
    pub fn get<T: FromSqlValue>(&self, key: &str) -> Result<T> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| OrmError::MissingAttribute(key.to_string()))?;
        T::from_sql_value(value).map_err(|e| OrmError::InvalidAttribute {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads a typed value, treating an absent key like NULL.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::InvalidAttribute`] when a present value cannot be
    /// converted.
    pub fn get_opt<T: FromSqlValue>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(_) => self.get(key).map(Some),
        }
    }

    /// Removes a key, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<SqlValue> {
        self.0.shift_remove(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the attributes to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect()
    }
}

impl FromIterator<(String, SqlValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Attributes {
    type Item = (String, SqlValue);
    type IntoIter = indexmap::map::IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<IndexMap<String, SqlValue>> for Attributes {
    fn from(map: IndexMap<String, SqlValue>) -> Self {
        Self(map)
    }
}

/// Converts a SQL value to its JSON representation.
#[must_use]
pub fn value_to_json(value: &SqlValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Int(n) => Value::from(*n),
        SqlValue::UInt(n) => Value::from(*n),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Blob(b) => Value::from(b.clone()),
        SqlValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        SqlValue::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
        SqlValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        SqlValue::Json(json) => json.clone(),
        SqlValue::List(items) => Value::Array(items.iter().map(value_to_json).collect()),
    }
}

// ===== Casts =====

/// How a raw column value is normalized when a model is hydrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    /// `int`, `integer`, `number`.
    Int,
    /// `real`, `float`, `double`, `decimal`.
    Float,
    /// `string`.
    String,
    /// `bool`, `boolean`.
    Bool,
    /// `date`.
    Date,
    /// `datetime`.
    DateTime,
    /// `json`, `object`, `array`.
    Json,
}

impl CastType {
    /// Returns the canonical cast name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Json => "json",
        }
    }

    /// Casts a value. NULL stays NULL and casting an already cast value
    /// returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Cast`] when the value cannot be represented.
    pub fn apply(self, key: &str, value: SqlValue) -> Result<SqlValue> {
        if value.is_null() {
            return Ok(value);
        }
        let fail = |reason: String| OrmError::Cast {
            key: key.to_string(),
            cast: self.name(),
            reason,
        };
        match self {
            Self::Int => cast_int(value).map_err(fail),
            Self::Float => value
                .as_f64()
                .map(SqlValue::Float)
                .ok_or_else(|| fail(format!("{} is not numeric", value.type_name()))),
            Self::String => cast_string(value).map_err(fail),
            Self::Bool => cast_bool(value).map_err(fail),
            Self::Date => cast_date(value).map_err(fail),
            Self::DateTime => cast_datetime(value).map_err(fail),
            Self::Json => cast_json(value).map_err(fail),
        }
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CastType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" | "number" => Ok(Self::Int),
            "real" | "float" | "double" | "decimal" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Bool),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "json" | "object" | "array" => Ok(Self::Json),
            _ => Err(OrmError::UnknownCast(s.to_string())),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cast_int(value: SqlValue) -> std::result::Result<SqlValue, String> {
    match value {
        SqlValue::Int(_) | SqlValue::UInt(_) => Ok(value),
        SqlValue::Bool(b) => Ok(SqlValue::Int(i64::from(b))),
        SqlValue::Float(f) if f.is_finite() => Ok(SqlValue::Int(f.trunc() as i64)),
        SqlValue::Text(ref s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .map(SqlValue::Int)
                .or_else(|_| trimmed.parse::<u64>().map(SqlValue::UInt))
                .map_err(|_| format!("`{s}` is not an integer"))
        }
        other => Err(format!("{} is not numeric", other.type_name())),
    }
}

fn cast_string(value: SqlValue) -> std::result::Result<SqlValue, String> {
    let text = match value {
        SqlValue::Text(_) => return Ok(value),
        SqlValue::Json(serde_json::Value::String(s)) => s,
        SqlValue::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::Time(t) => t.format("%H:%M:%S").to_string(),
        SqlValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        SqlValue::Json(json) => json.to_string(),
        SqlValue::List(_) => return Err(String::from("list cannot be a string")),
        other => other.to_sql_inline(),
    };
    Ok(SqlValue::Text(text))
}

fn cast_bool(value: SqlValue) -> std::result::Result<SqlValue, String> {
    let b = match value {
        SqlValue::Bool(b) => b,
        SqlValue::Int(n) => n != 0,
        SqlValue::UInt(n) => n != 0,
        SqlValue::Float(f) => f != 0.0,
        SqlValue::Text(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        SqlValue::Blob(b) => b.iter().any(|byte| *byte != 0),
        SqlValue::Json(serde_json::Value::Bool(b)) => b,
        other => return Err(format!("{} is not a boolean", other.type_name())),
    };
    Ok(SqlValue::Bool(b))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.fZ"];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn cast_date(value: SqlValue) -> std::result::Result<SqlValue, String> {
    match value {
        SqlValue::Date(_) => Ok(value),
        SqlValue::DateTime(dt) => Ok(SqlValue::Date(dt.date())),
        other => cast_datetime(other).map(|v| match v {
            SqlValue::DateTime(dt) => SqlValue::Date(dt.date()),
            v => v,
        }),
    }
}

fn cast_datetime(value: SqlValue) -> std::result::Result<SqlValue, String> {
    match value {
        SqlValue::DateTime(_) => Ok(value),
        SqlValue::Date(d) => Ok(SqlValue::DateTime(d.and_time(NaiveTime::MIN))),
        SqlValue::Text(ref s) => parse_datetime(s)
            .map(SqlValue::DateTime)
            .ok_or_else(|| format!("`{s}` is not a date")),
        SqlValue::Int(secs) => DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|dt| SqlValue::DateTime(dt.naive_utc()))
            .ok_or_else(|| format!("{secs} is out of range")),
        other => Err(format!("{} is not a date", other.type_name())),
    }
}

fn cast_json(value: SqlValue) -> std::result::Result<SqlValue, String> {
    match value {
        SqlValue::Json(_) => Ok(value),
        SqlValue::Text(s) => serde_json::from_str(&s)
            .map(SqlValue::Json)
            .map_err(|e| e.to_string()),
        SqlValue::Blob(b) => serde_json::from_slice(&b)
            .map(SqlValue::Json)
            .map_err(|e| e.to_string()),
        other => Ok(SqlValue::Json(value_to_json(&other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_cast_normalizes() {
        let cast = |v: SqlValue| CastType::Bool.apply("is_admin", v).unwrap();
        assert_eq!(cast(SqlValue::Int(0)), SqlValue::Bool(false));
        assert_eq!(cast(SqlValue::Int(1)), SqlValue::Bool(true));
        assert_eq!(cast(SqlValue::Bool(false)), SqlValue::Bool(false));
        assert_eq!(cast(SqlValue::Bool(true)), SqlValue::Bool(true));
        assert_eq!(cast(SqlValue::Text("false".into())), SqlValue::Bool(false));
        assert_eq!(cast(SqlValue::Text("0".into())), SqlValue::Bool(false));
    }

    #[test]
    fn test_casts_are_idempotent() {
        let samples = [
            (CastType::Int, SqlValue::Text("42".into())),
            (CastType::Float, SqlValue::Int(3)),
            (CastType::String, SqlValue::Int(7)),
            (CastType::Bool, SqlValue::Int(1)),
            (CastType::Date, SqlValue::Text("2024-05-01".into())),
            (CastType::DateTime, SqlValue::Text("2024-05-01 10:00:00".into())),
            (CastType::Json, SqlValue::Text(r#"{"a":[1,2]}"#.into())),
        ];
        for (cast, raw) in samples {
            let once = cast.apply("k", raw).unwrap();
            let twice = cast.apply("k", once.clone()).unwrap();
            assert_eq!(once, twice, "{cast} is not idempotent");
        }
    }

    #[test]
    fn test_json_cast_round_trip() {
        let original = serde_json::json!({"name": "sam", "tags": ["a", "b"], "n": 1});
        let serialized = SqlValue::Text(original.to_string());
        assert_eq!(
            CastType::Json.apply("meta", serialized).unwrap(),
            SqlValue::Json(original)
        );
    }

    #[test]
    fn test_null_is_never_cast() {
        for cast in [CastType::Int, CastType::Bool, CastType::Json] {
            assert_eq!(cast.apply("k", SqlValue::Null).unwrap(), SqlValue::Null);
        }
    }

    #[test]
    fn test_cast_failure() {
        let err = CastType::Int.apply("age", SqlValue::Text("abc".into())).unwrap_err();
        assert!(matches!(err, OrmError::Cast { cast: "int", .. }));
    }

    #[test]
    fn test_cast_names() {
        assert_eq!("BOOLEAN".parse::<CastType>().unwrap(), CastType::Bool);
        assert_eq!("decimal".parse::<CastType>().unwrap(), CastType::Float);
        assert_eq!("object".parse::<CastType>().unwrap(), CastType::Json);
        assert!("uuid".parse::<CastType>().is_err());
    }

    #[test]
    fn test_attributes_typed_access() {
        let attrs = Attributes::new()
            .with("id", 3_i64)
            .with("username", "sam")
            .with("deleted_at", SqlValue::Null);
        assert_eq!(attrs.get::<i64>("id").unwrap(), 3);
        assert_eq!(attrs.get::<String>("username").unwrap(), "sam");
        assert_eq!(attrs.get_opt::<String>("deleted_at").unwrap(), None);
        assert_eq!(attrs.get_opt::<String>("missing").unwrap(), None);
        assert!(matches!(
            attrs.get::<i64>("missing"),
            Err(OrmError::MissingAttribute(_))
        ));
        assert!(matches!(
            attrs.get::<i64>("username"),
            Err(OrmError::InvalidAttribute { .. })
        ));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), ["id", "username", "deleted_at"]);
    }
}
