mod field;
mod table;

pub use field::{ColumnDef, quote_ident};
pub use table::TableDef;
