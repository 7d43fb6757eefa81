use arrow::datatypes::{DataType, TimeUnit};

/// Default bound applied to every string column.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

// =================================================
// Sampled Kinds
// =================================================

/// Per-column type tag produced by the source reader at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SampledKind {
    Int64,
    Object,
    Float64,
    Bool,
    DateTimeNs,
    Date,
    Category,
    Unrecognized(String),
}

impl std::fmt::Display for SampledKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int64 => write!(f, "int64"),
            Self::Object => write!(f, "object"),
            Self::Float64 => write!(f, "float64"),
            Self::Bool => write!(f, "bool"),
            Self::DateTimeNs => write!(f, "datetime64[ns]"),
            Self::Date => write!(f, "date"),
            Self::Category => write!(f, "category"),
            Self::Unrecognized(name) => write!(f, "{}", name),
        }
    }
}

impl From<&DataType> for SampledKind {
    fn from(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int64 => SampledKind::Int64,
            DataType::Float64 => SampledKind::Float64,
            DataType::Boolean => SampledKind::Bool,
            DataType::Timestamp(TimeUnit::Nanosecond, _) => SampledKind::DateTimeNs,
            DataType::Date32 | DataType::Date64 => SampledKind::Date,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => SampledKind::Object,
            DataType::Dictionary(_, value)
                if matches!(**value, DataType::Utf8 | DataType::LargeUtf8) =>
            {
                SampledKind::Category
            }
            other => SampledKind::Unrecognized(other.to_string()),
        }
    }
}

// =================================================
// Store Types
// =================================================

/// Column type as declared in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreType {
    Integer,
    String { max_length: u32 },
    Float,
    Boolean,
    DateTime,
    Date,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

impl StoreType {
    pub fn bounded_string() -> Self {
        StoreType::String {
            max_length: DEFAULT_STRING_LENGTH,
        }
    }

    /// The `sql_type` function returns the SQLite column declaration for the store type.
    pub fn sql_type(&self) -> String {
        match self {
            StoreType::Integer => "BIGINT".into(),
            StoreType::String { max_length } => format!("VARCHAR({})", max_length),
            StoreType::Float => "FLOAT".into(),
            StoreType::Boolean => "BOOLEAN".into(),
            StoreType::DateTime => "DATETIME".into(),
            StoreType::Date => "DATE".into(),
        }
    }

    /// Arrow type used when reading values of this store type back.
    pub fn arrow_type(&self) -> DataType {
        match self {
            StoreType::Integer => DataType::Int64,
            StoreType::String { .. } => DataType::Utf8,
            StoreType::Float => DataType::Float64,
            StoreType::Boolean => DataType::Boolean,
            StoreType::DateTime => DataType::Timestamp(TimeUnit::Nanosecond, None),
            StoreType::Date => DataType::Date32,
        }
    }

    /// The `from_declared` function maps a declared SQLite column type back to a store type.
    ///
    /// Arguments:
    ///
    /// * `declared`: the type text reported by `PRAGMA table_info`, e.g. `BIGINT` or `VARCHAR(255)`.
    ///
    /// Returns:
    ///
    /// The matching `StoreType`; unknown declarations fall back to a bounded string.
    pub fn from_declared(declared: &str) -> Self {
        let normalized = declared.trim().to_lowercase();

        match normalized.as_str() {
            "bigint" | "integer" | "int" | "int8" | "int64" | "smallint" | "tinyint" => {
                StoreType::Integer
            }
            "float" | "real" | "double" | "double precision" | "float8" | "numeric" => {
                StoreType::Float
            }
            "boolean" | "bool" => StoreType::Boolean,
            "datetime" | "timestamp" => StoreType::DateTime,
            "date" => StoreType::Date,
            s if s.starts_with("varchar(") || s.starts_with("character varying(") => {
                let max_length = s
                    .split_once('(')
                    .and_then(|(_, rest)| rest.trim_end_matches(')').trim().parse::<u32>().ok())
                    .unwrap_or(DEFAULT_STRING_LENGTH);

                StoreType::String { max_length }
            }
            _ => StoreType::bounded_string(),
        }
    }
}

/// The `infer` function maps a sampled column kind to the store column type.
///
/// The mapping is total: kinds without a dedicated store type become a bounded string,
/// so classification never fails.
pub fn infer(kind: &SampledKind) -> StoreType {
    match kind {
        SampledKind::Int64 => StoreType::Integer,
        SampledKind::Object => StoreType::bounded_string(),
        SampledKind::Float64 => StoreType::Float,
        SampledKind::Bool => StoreType::Boolean,
        SampledKind::DateTimeNs => StoreType::DateTime,
        SampledKind::Date => StoreType::Date,
        SampledKind::Category => StoreType::bounded_string(),
        SampledKind::Unrecognized(_) => StoreType::bounded_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_infer_is_total() {
        let cases = [
            (SampledKind::Int64, StoreType::Integer),
            (SampledKind::Object, StoreType::bounded_string()),
            (SampledKind::Float64, StoreType::Float),
            (SampledKind::Bool, StoreType::Boolean),
            (SampledKind::DateTimeNs, StoreType::DateTime),
            (SampledKind::Date, StoreType::Date),
            (SampledKind::Category, StoreType::bounded_string()),
            (
                SampledKind::Unrecognized("complex128".into()),
                StoreType::bounded_string(),
            ),
        ];

        for (kind, expected) in cases {
            assert_eq!(infer(&kind), expected, "kind {}", kind);
        }
    }

    #[test]
    fn test_kind_from_arrow() {
        assert_eq!(SampledKind::from(&DataType::Int64), SampledKind::Int64);
        assert_eq!(SampledKind::from(&DataType::Utf8), SampledKind::Object);
        assert_eq!(
            SampledKind::from(&DataType::Timestamp(TimeUnit::Nanosecond, None)),
            SampledKind::DateTimeNs
        );
        assert_eq!(
            SampledKind::from(&DataType::Dictionary(
                Box::new(DataType::Int32),
                Box::new(DataType::Utf8)
            )),
            SampledKind::Category
        );
        assert!(matches!(
            SampledKind::from(&DataType::Null),
            SampledKind::Unrecognized(_)
        ));
        assert!(matches!(
            SampledKind::from(&DataType::List(Arc::new(arrow::datatypes::Field::new(
                "item",
                DataType::Int64,
                true
            )))),
            SampledKind::Unrecognized(_)
        ));
    }

    #[test]
    fn test_declared_round_trip() {
        for store_type in [
            StoreType::Integer,
            StoreType::Float,
            StoreType::Boolean,
            StoreType::DateTime,
            StoreType::Date,
            StoreType::String { max_length: 40 },
        ] {
            assert_eq!(StoreType::from_declared(&store_type.sql_type()), store_type);
        }

        assert_eq!(StoreType::from_declared("TEXT"), StoreType::bounded_string());
        assert_eq!(StoreType::from_declared(""), StoreType::bounded_string());
    }
}
