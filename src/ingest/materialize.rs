use sqlx::SqliteConnection;
use std::{path::Path, sync::Arc};

use crate::{
    error::TablesmithError,
    ingest::{
        LoaderConfig,
        catalog::{StoreLocation, validate_table_name},
        source::TabularSource,
        store::{self, SqliteStore},
    },
    types::{ColumnDef, TableDef},
};

// =================================================
// Conflict Policy
// =================================================

/// What to do when the target table name is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Insert the rows into the existing table
    Append,
    /// Drop the existing table and recreate it from the source
    Overwrite,
    /// Leave the existing table alone and create the given table instead
    CreateNew(String),
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::Overwrite => write!(f, "overwrite"),
            Self::CreateNew(name) => write!(f, "create-new ({})", name),
        }
    }
}

impl ConflictPolicy {
    /// The `parse` function reads an operator choice, either the menu code (`1`, `2`, `3`) or
    /// the policy name (`append`, `overwrite`, `create-new`).
    ///
    /// Arguments:
    ///
    /// * `choice`: the operator's answer.
    /// * `new_name`: the table name used by `create-new`.
    ///
    /// Returns:
    ///
    /// The selected policy or a validation error for an unknown choice or a missing new name.
    pub fn parse(choice: &str, new_name: Option<&str>) -> Result<Self, TablesmithError> {
        if Self::needs_new_name(choice) {
            let name = new_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    TablesmithError::Validation("create-new requires a new table name".into())
                })?;

            return Ok(ConflictPolicy::CreateNew(name.to_string()));
        }

        match choice.trim().to_lowercase().as_str() {
            "1" | "append" => Ok(ConflictPolicy::Append),
            "2" | "overwrite" => Ok(ConflictPolicy::Overwrite),
            other => Err(TablesmithError::Validation(format!(
                "Unknown conflict choice: {}",
                other
            ))),
        }
    }

    /// Whether `choice` selects `create-new`, which takes a second answer.
    pub fn needs_new_name(choice: &str) -> bool {
        matches!(
            choice.trim().to_lowercase().as_str(),
            "3" | "create-new" | "create_new" | "new"
        )
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Append => 1,
            Self::Overwrite => 2,
            Self::CreateNew(_) => 3,
        }
    }
}

/// How a materialization ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Created,
    Appended,
    Overwritten,
    CreatedNew { original: String },
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Appended => write!(f, "appended"),
            Self::Overwritten => write!(f, "overwritten"),
            Self::CreatedNew { original } => write!(f, "created alongside {}", original),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub table: TableDef,
    pub resolution: Resolution,
    pub rows_written: u64,
}

enum WriteMode {
    Create,
    Replace,
    Append,
}

// =================================================
// Table Materializer
// =================================================

#[derive(Debug, Clone)]
pub struct TableMaterializer {
    location: StoreLocation,
    config: Arc<LoaderConfig>,
}

impl TableMaterializer {
    pub fn new(location: StoreLocation, config: LoaderConfig) -> Self {
        Self {
            location,
            config: Arc::new(config),
        }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Whether `table_name` is already taken, without creating the store file.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool, TablesmithError> {
        let namespace = self.location.namespace_for(table_name)?;

        let Some(store) = SqliteStore::open_existing(&namespace).await? else {
            return Ok(false);
        };

        let exists = store.table_exists(table_name).await;
        store.close().await;

        exists
    }

    /// Reads a delimited file with the materializer's loader settings and materializes it.
    pub async fn load_csv(
        &self,
        path: impl AsRef<Path>,
        table_name: &str,
        policy: ConflictPolicy,
    ) -> Result<Materialized, TablesmithError> {
        let source = TabularSource::from_csv(path, &self.config)?;

        self.materialize(&source, table_name, policy).await
    }

    /// The `materialize` function stores `source` as the table `table_name`, resolving a name
    /// collision with `policy`.
    ///
    /// Arguments:
    ///
    /// * `source`: the rows to store; must have at least one row and one column.
    /// * `table_name`: the target table.
    /// * `policy`: applied only when `table_name` already exists in its store file.
    ///
    /// Returns:
    ///
    /// The resulting table and how the request was resolved. Validation errors are raised
    /// before the store is touched; every store failure is reported as a materialization error
    /// and the table is left as it was before the call.
    pub async fn materialize(
        &self,
        source: &TabularSource,
        table_name: &str,
        policy: ConflictPolicy,
    ) -> Result<Materialized, TablesmithError> {
        if source.is_empty() {
            return Err(TablesmithError::Validation("source is empty".into()));
        }

        let namespace = self.location.namespace_for(table_name)?;
        let columns = source.column_defs(&self.config.key_column)?;

        let fresh = !namespace.exists();

        let store = SqliteStore::open(&namespace)
            .await
            .map_err(|e| wrap(table_name, e))?;

        let result = self
            .resolve(&store, source, table_name, columns, policy)
            .await;

        store.close().await;

        if fresh && result.is_err() {
            StoreLocation::discard(&namespace);
        }

        if let Ok(materialized) = &result {
            log::info!(
                "{} ({}, {} rows written)",
                materialized.table,
                materialized.resolution,
                materialized.rows_written
            );
        }

        result
    }

    async fn resolve(
        &self,
        store: &SqliteStore,
        source: &TabularSource,
        table_name: &str,
        columns: Vec<ColumnDef>,
        policy: ConflictPolicy,
    ) -> Result<Materialized, TablesmithError> {
        let stored = store
            .stored_name(table_name)
            .await
            .map_err(|e| wrap(table_name, e))?;

        let Some(stored) = stored else {
            return self
                .write(store, source, table_name, columns, WriteMode::Create)
                .await
                .map(|(table, rows_written)| Materialized {
                    table,
                    resolution: Resolution::Created,
                    rows_written,
                });
        };

        // SQLite resolves table names without regard to ASCII case
        let table_name = stored.as_str();

        log::info!("Table {} exists, resolving with {}", table_name, policy);

        match policy {
            ConflictPolicy::Append => self
                .write(store, source, table_name, columns, WriteMode::Append)
                .await
                .map(|(table, rows_written)| Materialized {
                    table,
                    resolution: Resolution::Appended,
                    rows_written,
                }),
            ConflictPolicy::Overwrite => self
                .write(store, source, table_name, columns, WriteMode::Replace)
                .await
                .map(|(table, rows_written)| Materialized {
                    table,
                    resolution: Resolution::Overwritten,
                    rows_written,
                }),
            ConflictPolicy::CreateNew(new_name) => {
                self.create_new(store, source, table_name, &new_name, columns)
                    .await
            }
        }
    }

    async fn create_new(
        &self,
        store: &SqliteStore,
        source: &TabularSource,
        table_name: &str,
        new_name: &str,
        columns: Vec<ColumnDef>,
    ) -> Result<Materialized, TablesmithError> {
        validate_table_name(new_name)?;

        if new_name.eq_ignore_ascii_case(table_name) {
            return Err(TablesmithError::Validation(format!(
                "New table name must differ from {}",
                table_name
            )));
        }

        let created = |(table, rows_written): (TableDef, u64)| Materialized {
            table,
            resolution: Resolution::CreatedNew {
                original: table_name.to_string(),
            },
            rows_written,
        };

        if self.location.shares_namespace(table_name, new_name)? {
            ensure_absent(store, new_name).await?;

            return self
                .write(store, source, new_name, columns, WriteMode::Create)
                .await
                .map(created);
        }

        let other_namespace = self.location.namespace_for(new_name)?;
        let fresh = !other_namespace.exists();

        let other = SqliteStore::open(&other_namespace)
            .await
            .map_err(|e| wrap(new_name, e))?;

        let result = match ensure_absent(&other, new_name).await {
            Ok(()) => self
                .write(&other, source, new_name, columns, WriteMode::Create)
                .await
                .map(created),
            Err(e) => Err(e),
        };

        other.close().await;

        if fresh && result.is_err() {
            StoreLocation::discard(&other_namespace);
        }

        result
    }

    /// Runs one write inside a transaction, rolling back on any failure.
    async fn write(
        &self,
        store: &SqliteStore,
        source: &TabularSource,
        table_name: &str,
        columns: Vec<ColumnDef>,
        mode: WriteMode,
    ) -> Result<(TableDef, u64), TablesmithError> {
        let mut tx = store
            .pool()
            .begin()
            .await
            .map_err(|e| wrap(table_name, e))?;

        let outcome = self
            .write_steps(&mut tx, &store.namespace(), source, table_name, columns, mode)
            .await;

        match outcome {
            Ok(written) => {
                tx.commit().await.map_err(|e| wrap(table_name, e))?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    log::warn!("Rollback of {} failed: {}", table_name, rollback);
                }

                Err(wrap(table_name, e))
            }
        }
    }

    async fn write_steps(
        &self,
        conn: &mut SqliteConnection,
        namespace: &str,
        source: &TabularSource,
        table_name: &str,
        columns: Vec<ColumnDef>,
        mode: WriteMode,
    ) -> Result<(TableDef, u64), TablesmithError> {
        let chunk_rows = self.config.insert_chunk_rows;

        match mode {
            WriteMode::Append => {
                let rows_written =
                    store::insert_batch(conn, table_name, source.batch(), chunk_rows).await?;

                let table = store::read_table_def(conn, namespace, table_name)
                    .await?
                    .ok_or_else(|| {
                        TablesmithError::materialization(table_name, "table disappeared")
                    })?;

                Ok((table, rows_written))
            }
            WriteMode::Create | WriteMode::Replace => {
                if matches!(mode, WriteMode::Replace) {
                    store::drop_table(conn, table_name).await?;
                }

                let mut table = TableDef::new(namespace, table_name, columns);

                store::create_table(conn, &table).await?;

                let rows_written =
                    store::insert_batch(conn, table_name, source.batch(), chunk_rows).await?;

                table.row_count = store::count_rows(conn, table_name).await?;

                Ok((table, rows_written))
            }
        }
    }
}

async fn ensure_absent(store: &SqliteStore, table_name: &str) -> Result<(), TablesmithError> {
    let exists = store
        .table_exists(table_name)
        .await
        .map_err(|e| wrap(table_name, e))?;

    if exists {
        return Err(TablesmithError::Validation(format!(
            "Table {} already exists",
            table_name
        )));
    }

    Ok(())
}

/// Reports a failure as a materialization error unless it already is one (or a validation error).
fn wrap(table_name: &str, e: impl Into<TablesmithError>) -> TablesmithError {
    match e.into() {
        e @ (TablesmithError::Validation(_) | TablesmithError::Materialization { .. }) => e,
        other => TablesmithError::materialization(table_name, other),
    }
}
