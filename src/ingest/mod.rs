//! Loading of delimited files into SQLite tables
//!
//! Overview
//! - [`TabularSource`]: An in-memory CSV file with a kind tag per column.
//! - [`infer`]: The total mapping from sampled column kinds to store types.
//! - [`StoreLocation`]: Where the store files live and which file holds a table.
//! - [`TableMaterializer`]: Creates, appends to, overwrites or aliases tables from a source.
//! - [`TableInspector`]: Reads a stored table back for display.
//! - [`LoaderConfig`]: Reader and loader settings shared by the components above.
//!

use arrow::compute::CastOptions;

pub mod catalog;
pub mod inference;
pub mod inspect;
pub mod materialize;
pub mod source;
pub mod store;

pub use catalog::{StoreLayout, StoreLocation};
pub use inference::{SampledKind, StoreType, infer};
pub use inspect::{Inspection, TableInspector};
pub use materialize::{ConflictPolicy, Materialized, Resolution, TableMaterializer};
pub use source::TabularSource;

/// Cast options that fail on overflow or unparseable values instead of producing nulls.
pub(crate) fn strict_cast() -> CastOptions<'static> {
    CastOptions {
        safe: false,
        ..Default::default()
    }
}

/// Column that receives the `PRIMARY KEY` constraint when a table is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyColumn {
    /// No key constraint
    #[default]
    None,
    /// Column at ordinal position 0
    First,
    Named(String),
}

impl std::str::FromStr for KeyColumn {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(KeyColumn::None),
            "first" => Ok(KeyColumn::First),
            name => Ok(KeyColumn::Named(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub has_header: bool,
    pub delimiter: u8,
    /// Rows used for schema inference, `None` reads the whole file
    pub infer_rows: Option<usize>,
    pub batch_size: usize,
    pub insert_chunk_rows: usize,
    pub key_column: KeyColumn,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            has_header: true,
            delimiter: b',',
            infer_rows: None,
            batch_size: 8192,
            insert_chunk_rows: 500,
            key_column: KeyColumn::None,
        }
    }
}

impl LoaderConfig {
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.config.has_header = has_header;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn infer_rows(mut self, infer_rows: usize) -> Self {
        self.config.infer_rows = Some(infer_rows);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size.max(1);
        self
    }

    pub fn insert_chunk_rows(mut self, rows: usize) -> Self {
        self.config.insert_chunk_rows = rows.max(1);
        self
    }

    pub fn key_column(mut self, key_column: KeyColumn) -> Self {
        self.config.key_column = key_column;
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LoaderConfig::builder()
            .delimiter(b';')
            .insert_chunk_rows(0)
            .key_column(KeyColumn::First)
            .build();

        assert!(config.has_header);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.insert_chunk_rows, 1);
        assert_eq!(config.key_column, KeyColumn::First);
    }

    #[test]
    fn test_key_column_parse() {
        assert_eq!("first".parse::<KeyColumn>().unwrap(), KeyColumn::First);
        assert_eq!("none".parse::<KeyColumn>().unwrap(), KeyColumn::None);
        assert_eq!(
            "id".parse::<KeyColumn>().unwrap(),
            KeyColumn::Named("id".into())
        );
    }
}
