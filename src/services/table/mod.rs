pub mod ingest;
pub mod types;
pub mod utils;

pub use ingest::{read_table, IngestOptions, SourceFormat};
pub use types::{Cell, Column, ColumnData, ColumnKind, Table};
