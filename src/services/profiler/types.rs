use serde::Serialize;

use super::stats::ValueCount;
use crate::services::table::{Cell, ColumnKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    /// Position of the row in the uploaded table.
    pub index: usize,
    pub values: Vec<Cell>,
}

/// Structural description of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValues {
    pub column: String,
    pub missing: usize,
}

/// One row of the combined descriptive-statistics report.
///
/// Fields that do not apply to the column's kind are `None`. Fields that
/// apply but are undefined (e.g. the mean of a column with no values) are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribeRow {
    pub column: String,
    pub kind: ColumnKind,
    pub count: usize,
    pub unique: Option<usize>,
    pub top: Option<String>,
    pub freq: Option<usize>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub sample: Vec<SampleRow>,
    pub columns: Vec<ColumnInfo>,
    pub missing_values: Vec<MissingValues>,
    pub statistics: Vec<DescribeRow>,
}

impl DatasetSummary {
    pub fn missing_for(&self, column: &str) -> Option<usize> {
        self.missing_values
            .iter()
            .find(|entry| entry.column == column)
            .map(|entry| entry.missing)
    }

    pub fn statistics_for(&self, column: &str) -> Option<&DescribeRow> {
        self.statistics.iter().find(|row| row.column == column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStatistics {
    pub column: String,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub missing_count: usize,
}

/// Per-column statistics for the numeric columns of a table, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct BasicStatistics {
    pub columns: Vec<NumericStatistics>,
}

impl BasicStatistics {
    pub fn get(&self, column: &str) -> Option<&NumericStatistics> {
        self.columns.iter().find(|stats| stats.column == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileDetail {
    Numeric { mean: f64, median: f64, std_dev: f64 },
    Categorical { frequencies: Vec<ValueCount> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing_count: usize,
    pub detail: ProfileDetail,
}
