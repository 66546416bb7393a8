use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::dataset_store::StoredDataset;
use crate::services::profiler::ColumnInfo;
use crate::services::table::SourceFormat;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub name: Option<String>,
}

/// Returned after an upload or replacement.
#[derive(Debug, Serialize)]
pub struct DatasetHandle {
    pub dataset_id: String,
    pub name: String,
    pub format: SourceFormat,
    pub uploaded_at: DateTime<Utc>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnInfo>,
}

impl From<&Arc<StoredDataset>> for DatasetHandle {
    fn from(dataset: &Arc<StoredDataset>) -> Self {
        let table = &dataset.table;
        Self {
            dataset_id: dataset.id.clone(),
            name: dataset.name.clone(),
            format: dataset.format,
            uploaded_at: dataset.uploaded_at,
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: table
                .columns()
                .iter()
                .map(|column| ColumnInfo {
                    name: column.name().to_string(),
                    kind: column.kind(),
                    non_null_count: column.non_null_count(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedDataset {
    pub dataset_id: String,
    pub deleted: bool,
}
