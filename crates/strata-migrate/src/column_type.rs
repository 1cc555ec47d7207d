//! MySQL column type vocabulary.
//!
//! Each [`ColumnType`] renders to the type clause of a column definition and
//! maps back from the native type strings MySQL reports when a schema is
//! inspected.

use std::fmt;

use strata_core::escape_string;

use crate::column::ColumnDefinition;
use crate::error::{MigrateError, Result};

/// Length used for character and binary columns declared without one.
pub const DEFAULT_LENGTH: u32 = 255;

/// A MySQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    // ===== Numeric =====
    /// `tinyint`
    TinyInt,
    /// `smallint`
    SmallInt,
    /// `mediumint`
    MediumInt,
    /// `int`
    Int,
    /// `bigint`
    BigInt,
    /// `decimal`
    Decimal,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `bit`
    Bit,

    // ===== String =====
    /// `char`
    Char,
    /// `varchar`
    Varchar,
    /// `binary`
    Binary,
    /// `varbinary`
    Varbinary,
    /// `tinyblob`
    TinyBlob,
    /// `blob`
    Blob,
    /// `mediumblob`
    MediumBlob,
    /// `longblob`
    LongBlob,
    /// `tinytext`
    TinyText,
    /// `text`
    Text,
    /// `mediumtext`
    MediumText,
    /// `longtext`
    LongText,
    /// `enum`
    Enum,
    /// `set`
    Set,

    // ===== Date and time =====
    /// `date`
    Date,
    /// `time`
    Time,
    /// `datetime`
    DateTime,
    /// `timestamp`
    Timestamp,
    /// `year`
    Year,

    // ===== Spatial =====
    /// `geometry`
    Geometry,
    /// `point`
    Point,
    /// `linestring`
    LineString,
    /// `polygon`
    Polygon,
    /// `geometrycollection`
    GeometryCollection,
    /// `multilinestring`
    MultiLineString,
    /// `multipoint`
    MultiPoint,
    /// `multipolygon`
    MultiPolygon,

    // ===== JSON =====
    /// `json`
    Json,
}

impl ColumnType {
    /// Every type, in declaration order.
    pub const ALL: [Self; 37] = [
        Self::TinyInt,
        Self::SmallInt,
        Self::MediumInt,
        Self::Int,
        Self::BigInt,
        Self::Decimal,
        Self::Float,
        Self::Double,
        Self::Bit,
        Self::Char,
        Self::Varchar,
        Self::Binary,
        Self::Varbinary,
        Self::TinyBlob,
        Self::Blob,
        Self::MediumBlob,
        Self::LongBlob,
        Self::TinyText,
        Self::Text,
        Self::MediumText,
        Self::LongText,
        Self::Enum,
        Self::Set,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Timestamp,
        Self::Year,
        Self::Geometry,
        Self::Point,
        Self::LineString,
        Self::Polygon,
        Self::GeometryCollection,
        Self::MultiLineString,
        Self::MultiPoint,
        Self::MultiPolygon,
        Self::Json,
    ];

    /// Returns the lowercase MySQL type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::MediumInt => "mediumint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bit => "bit",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Binary => "binary",
            Self::Varbinary => "varbinary",
            Self::TinyBlob => "tinyblob",
            Self::Blob => "blob",
            Self::MediumBlob => "mediumblob",
            Self::LongBlob => "longblob",
            Self::TinyText => "tinytext",
            Self::Text => "text",
            Self::MediumText => "mediumtext",
            Self::LongText => "longtext",
            Self::Enum => "enum",
            Self::Set => "set",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Year => "year",
            Self::Geometry => "geometry",
            Self::Point => "point",
            Self::LineString => "linestring",
            Self::Polygon => "polygon",
            Self::GeometryCollection => "geometrycollection",
            Self::MultiLineString => "multilinestring",
            Self::MultiPoint => "multipoint",
            Self::MultiPolygon => "multipolygon",
            Self::Json => "json",
        }
    }

    /// Maps a native type string such as `bigint(20) unsigned` or
    /// `varchar(255)` back to a column type.
    #[must_use]
    pub fn from_native(native: &str) -> Option<Self> {
        let base = native
            .trim()
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()?
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.name() == base)
    }

    /// Returns true for integer and floating point types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::TinyInt
                | Self::SmallInt
                | Self::MediumInt
                | Self::Int
                | Self::BigInt
                | Self::Decimal
                | Self::Float
                | Self::Double
        )
    }

    /// Renders the type clause for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Configuration`] for an enum or set column
    /// declared without values.
    pub fn render(self, column: &ColumnDefinition) -> Result<String> {
        let name = self.name();
        let precision = column.precision().filter(|p| *p > 0);

        let mut rendered = match self {
            Self::TinyInt
            | Self::SmallInt
            | Self::MediumInt
            | Self::Int
            | Self::BigInt
            | Self::Bit => match column.length() {
                Some(length) => format!("{name}({length})"),
                None => name.to_string(),
            },
            Self::Decimal => match (precision, column.scale()) {
                (Some(p), Some(s)) => format!("decimal({p}, {s})"),
                (Some(p), None) => format!("decimal({p})"),
                (None, _) => name.to_string(),
            },
            Self::Char | Self::Varchar | Self::Binary | Self::Varbinary => {
                format!("{name}({})", column.length().unwrap_or(DEFAULT_LENGTH))
            }
            Self::Enum | Self::Set => {
                if column.values().is_empty() {
                    return Err(MigrateError::Configuration(format!(
                        "column `{}` of type {name} declares no values",
                        column.name()
                    )));
                }
                let values: Vec<String> =
                    column.values().iter().map(|v| escape_string(v)).collect();
                format!("{name}({})", values.join(","))
            }
            Self::Time | Self::DateTime | Self::Timestamp => {
                let rendered = match precision {
                    Some(p) => format!("{name}({p})"),
                    None => name.to_string(),
                };
                if self != Self::Time && column.uses_current_timestamp() {
                    match precision {
                        Some(p) => format!("{rendered} default CURRENT_TIMESTAMP({p})"),
                        None => format!("{rendered} default CURRENT_TIMESTAMP"),
                    }
                } else {
                    rendered
                }
            }
            Self::Float
            | Self::Double
            | Self::TinyBlob
            | Self::Blob
            | Self::MediumBlob
            | Self::LongBlob
            | Self::TinyText
            | Self::Text
            | Self::MediumText
            | Self::LongText
            | Self::Date
            | Self::Year
            | Self::Geometry
            | Self::Point
            | Self::LineString
            | Self::Polygon
            | Self::GeometryCollection
            | Self::MultiLineString
            | Self::MultiPoint
            | Self::MultiPolygon
            | Self::Json => name.to_string(),
        };

        if column.is_unsigned() && self.is_numeric() {
            rendered.push_str(" unsigned");
        }
        Ok(rendered)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(column: &ColumnDefinition) -> String {
        column.column_type().render(column).unwrap()
    }

    #[test]
    fn test_from_native() {
        assert_eq!(ColumnType::from_native("bigint(20) unsigned"), Some(ColumnType::BigInt));
        assert_eq!(ColumnType::from_native("varchar(255)"), Some(ColumnType::Varchar));
        assert_eq!(ColumnType::from_native("TIMESTAMP"), Some(ColumnType::Timestamp));
        assert_eq!(ColumnType::from_native("enum('a','b')"), Some(ColumnType::Enum));
        assert_eq!(ColumnType::from_native("serial"), None);
        assert_eq!(ColumnType::from_native(""), None);
    }

    #[test]
    fn test_names_round_trip() {
        for ty in ColumnType::ALL {
            assert_eq!(ColumnType::from_native(ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_string_lengths() {
        let column = ColumnDefinition::new("name", ColumnType::Varchar);
        assert_eq!(render(&column), "varchar(255)");
        let column = ColumnDefinition::new("code", ColumnType::Char).with_length(2);
        assert_eq!(render(&column), "char(2)");
    }

    #[test]
    fn test_unsigned_integers() {
        let mut column = ColumnDefinition::new("id", ColumnType::BigInt);
        column.unsigned();
        assert_eq!(render(&column), "bigint unsigned");

        let mut column = ColumnDefinition::new("at", ColumnType::Date);
        column.unsigned();
        assert_eq!(render(&column), "date");
    }

    #[test]
    fn test_decimal_precision() {
        let column = ColumnDefinition::new("price", ColumnType::Decimal)
            .with_precision(8)
            .with_scale(2);
        assert_eq!(render(&column), "decimal(8, 2)");
    }

    #[test]
    fn test_timestamps() {
        let column = ColumnDefinition::new("created_at", ColumnType::Timestamp).with_precision(0);
        assert_eq!(render(&column), "timestamp");

        let mut column = ColumnDefinition::new("created_at", ColumnType::Timestamp).with_precision(3);
        column.use_current_timestamp();
        assert_eq!(render(&column), "timestamp(3) default CURRENT_TIMESTAMP(3)");

        let mut column = ColumnDefinition::new("seen_at", ColumnType::DateTime);
        column.use_current_timestamp();
        assert_eq!(render(&column), "datetime default CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_enum_values() {
        let column = ColumnDefinition::new("state", ColumnType::Enum)
            .with_values(["draft", "it's live"]);
        assert_eq!(render(&column), "enum('draft','it\\'s live')");

        let column = ColumnDefinition::new("state", ColumnType::Set);
        assert!(matches!(
            column.column_type().render(&column),
            Err(MigrateError::Configuration(_))
        ));
    }
}
