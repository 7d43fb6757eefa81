#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod assistant;
mod error;
pub mod ingest;

mod types;

pub use assistant::{CompletionClient, CompletionConfig};
pub use error::TablesmithError;
pub use ingest::{
    ConflictPolicy, Inspection, KeyColumn, LoaderConfig, Materialized, Resolution, SampledKind,
    StoreLayout, StoreLocation, StoreType, TableInspector, TableMaterializer, TabularSource, infer,
};
pub use types::{ColumnDef, TableDef};
