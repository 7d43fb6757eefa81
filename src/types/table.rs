use arrow::datatypes::Schema;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{ColumnDef, quote_ident};

#[derive(Debug, Clone)]
pub struct TableDef {
    pub id: Uuid,
    /// Store file holding the table
    pub namespace: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub row_count: u64,
}

impl std::fmt::Display for TableDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "table {} ({} columns, {} rows) in {}",
            self.name,
            self.columns.len(),
            self.row_count,
            self.namespace
        )
    }
}

impl TableDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        TableDef {
            id: Uuid::now_v7(),
            namespace: namespace.into(),
            name: name.into(),
            columns,
            row_count: 0,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn arrow_schema(&self) -> Arc<Schema> {
        let fields: Vec<_> = self.columns.iter().map(|c| c.to_field()).collect();

        Arc::new(Schema::new(fields))
    }

    /// The `create_statement` function renders the `CREATE TABLE` statement for this table.
    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| c.ddl())
            .collect::<Vec<String>>()
            .join(", ");

        format!("CREATE TABLE {} ({})", quote_ident(&self.name), columns)
    }
}
