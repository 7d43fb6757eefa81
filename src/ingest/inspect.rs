use arrow::{array::RecordBatch, util::pretty::pretty_format_batches};

use crate::{
    error::TablesmithError,
    ingest::{catalog::StoreLocation, store::SqliteStore},
    types::TableDef,
};

/// Result of reading a stored table back.
#[derive(Debug, Clone)]
pub enum Inspection {
    /// The table exists and holds no rows
    Empty { table: TableDef },
    /// Every row in storage order
    Rows { table: TableDef, batch: RecordBatch },
}

impl Inspection {
    pub fn table(&self) -> &TableDef {
        match self {
            Inspection::Empty { table } | Inspection::Rows { table, .. } => table,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Inspection::Empty { .. })
    }

    /// Renders the rows as an ASCII table, or the empty-table notice.
    pub fn render(&self) -> Result<String, TablesmithError> {
        match self {
            Inspection::Empty { table } => Ok(format!("Table {} is empty", table.name)),
            Inspection::Rows { batch, .. } => {
                Ok(pretty_format_batches(std::slice::from_ref(batch))?.to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableInspector {
    location: StoreLocation,
}

impl TableInspector {
    pub fn new(location: StoreLocation) -> Self {
        Self { location }
    }

    /// The `inspect` function reads every row of `table_name` from its store file.
    ///
    /// Returns:
    ///
    /// An `Inspection`, or a not-found error when neither the store file nor the table exists.
    /// A missing store file is never created.
    pub async fn inspect(&self, table_name: &str) -> Result<Inspection, TablesmithError> {
        let namespace = self.location.namespace_for(table_name)?;

        let Some(store) = SqliteStore::open_existing(&namespace).await? else {
            return Err(TablesmithError::NotFound(table_name.to_string()));
        };

        let result = read(&store, table_name).await;

        store.close().await;

        result
    }

    /// The `tables` function lists every user table at this location, sorted by name.
    pub async fn tables(&self) -> Result<Vec<String>, TablesmithError> {
        let mut names = Vec::new();

        for namespace in self.location.namespaces()? {
            let Some(store) = SqliteStore::open_existing(&namespace).await? else {
                continue;
            };

            let listed = store.table_names().await;
            store.close().await;

            names.extend(listed?);
        }

        names.sort();
        names.dedup();

        Ok(names)
    }
}

async fn read(store: &SqliteStore, table_name: &str) -> Result<Inspection, TablesmithError> {
    let table = store
        .table_def(table_name)
        .await?
        .ok_or_else(|| TablesmithError::NotFound(table_name.to_string()))?;

    if table.row_count == 0 {
        log::debug!("Table {} has no rows", table_name);
        return Ok(Inspection::Empty { table });
    }

    let batch = store.read_rows(&table).await?;

    Ok(Inspection::Rows { table, batch })
}
