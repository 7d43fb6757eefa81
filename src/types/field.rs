use arrow::datatypes::Field;

use crate::ingest::inference::{SampledKind, StoreType, infer};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ordinal: usize,
    /// Tag recorded by the reader; `None` for columns read back from the store
    pub sampled_kind: Option<SampledKind>,
    pub store_type: StoreType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
}

impl std::fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.store_type)?;

        if self.is_primary_key {
            write!(f, " (primary key)")?;
        }

        Ok(())
    }
}

impl ColumnDef {
    pub fn from_field(ordinal: usize, field: &Field) -> Self {
        let kind = SampledKind::from(field.data_type());

        ColumnDef {
            name: field.name().clone(),
            ordinal,
            store_type: infer(&kind),
            sampled_kind: Some(kind),
            is_primary_key: false,
            is_nullable: field.is_nullable(),
        }
    }

    pub fn to_field(&self) -> Field {
        Field::new(
            self.name.clone(),
            self.store_type.arrow_type(),
            self.is_nullable,
        )
    }

    /// Column clause for `CREATE TABLE`
    pub fn ddl(&self) -> String {
        let mut clause = format!("{} {}", quote_ident(&self.name), self.store_type.sql_type());

        if self.is_primary_key {
            clause.push_str(" PRIMARY KEY");
        } else if !self.is_nullable {
            clause.push_str(" NOT NULL");
        }

        clause
    }
}

/// Quotes an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;

    use super::*;

    #[test]
    fn test_column_from_field() {
        let column = ColumnDef::from_field(2, &Field::new("age", DataType::Int64, true));

        assert_eq!(column.ordinal, 2);
        assert_eq!(column.store_type, StoreType::Integer);
        assert_eq!(column.sampled_kind, Some(SampledKind::Int64));
        assert_eq!(column.ddl(), "\"age\" BIGINT");
    }

    #[test]
    fn test_ddl_quotes_names() {
        let mut column = ColumnDef::from_field(0, &Field::new("first \"name\"", DataType::Utf8, false));
        assert_eq!(column.ddl(), "\"first \"\"name\"\"\" VARCHAR(255) NOT NULL");

        column.is_primary_key = true;
        assert!(column.ddl().ends_with("PRIMARY KEY"));
    }
}
