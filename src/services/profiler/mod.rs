//! Dataset-level and per-column descriptive statistics.
//!
//! Every operation is a pure function of the table it is handed: nothing is
//! cached and nothing outlives the call except the returned report.

pub mod stats;
pub mod types;

use rand::Rng;
use rayon::prelude::*;

use crate::error::EngineError;
use crate::services::table::{Column, ColumnData, Table};
use stats::{mean, median, present, quantile_sorted, sample_std, sorted, value_counts};
pub use types::{
    BasicStatistics, ColumnInfo, ColumnProfile, DatasetSummary, DescribeRow, MissingValues,
    NumericStatistics, ProfileDetail, SampleRow,
};

pub const SAMPLE_ROWS: usize = 10;

pub fn describe(table: &Table) -> Result<DatasetSummary, EngineError> {
    describe_with_rng(table, &mut rand::thread_rng())
}

/// [`describe`] with a caller-supplied source of randomness for the sample.
pub fn describe_with_rng<R: Rng + ?Sized>(
    table: &Table,
    rng: &mut R,
) -> Result<DatasetSummary, EngineError> {
    ensure_columns(table, "describe")?;
    tracing::debug!(
        "Describing table with {} rows and {} columns",
        table.row_count(),
        table.column_count()
    );

    let columns = table
        .columns()
        .iter()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            kind: column.kind(),
            non_null_count: column.non_null_count(),
        })
        .collect();

    let missing_values = table
        .columns()
        .iter()
        .map(|column| MissingValues {
            column: column.name().to_string(),
            missing: column.missing_count(),
        })
        .collect();

    let statistics = table.columns().par_iter().map(describe_column).collect();

    Ok(DatasetSummary {
        row_count: table.row_count(),
        column_count: table.column_count(),
        sample: sample_rows(table, rng),
        columns,
        missing_values,
        statistics,
    })
}

fn ensure_columns(table: &Table, operation: &'static str) -> Result<(), EngineError> {
    if table.column_count() == 0 {
        tracing::warn!("{} requested on a table without columns", operation);
        return Err(EngineError::EmptyTable { operation });
    }
    Ok(())
}

fn sample_rows<R: Rng + ?Sized>(table: &Table, rng: &mut R) -> Vec<SampleRow> {
    let row_count = table.row_count();
    let indices: Vec<usize> = if row_count <= SAMPLE_ROWS {
        (0..row_count).collect()
    } else {
        rand::seq::index::sample(rng, row_count, SAMPLE_ROWS).into_vec()
    };

    indices
        .into_iter()
        .map(|index| SampleRow {
            index,
            values: table.row(index),
        })
        .collect()
}

fn describe_column(column: &Column) -> DescribeRow {
    let mut row = DescribeRow {
        column: column.name().to_string(),
        kind: column.kind(),
        count: column.non_null_count(),
        unique: None,
        top: None,
        freq: None,
        mean: None,
        std: None,
        min: None,
        q25: None,
        q50: None,
        q75: None,
        max: None,
    };

    match column.data() {
        ColumnData::Numeric(values) => {
            let values = present(values);
            let ordered = sorted(&values);
            row.mean = Some(mean(&values));
            row.std = Some(sample_std(&values));
            row.min = Some(quantile_sorted(&ordered, 0.0));
            row.q25 = Some(quantile_sorted(&ordered, 0.25));
            row.q50 = Some(quantile_sorted(&ordered, 0.5));
            row.q75 = Some(quantile_sorted(&ordered, 0.75));
            row.max = Some(quantile_sorted(&ordered, 1.0));
        }
        ColumnData::Categorical(values) => {
            let counts = value_counts(values.iter().flatten().map(String::as_str));
            row.unique = Some(counts.len());
            if let Some(top) = counts.into_iter().next() {
                row.top = Some(top.value);
                row.freq = Some(top.count);
            }
        }
    }

    row
}

/// Mean, median, sample standard deviation and missing count for each
/// numeric column. Categorical columns are left out.
pub fn basic_statistics(table: &Table) -> BasicStatistics {
    let numeric: Vec<&Column> = table.numeric_columns().collect();
    let columns = numeric
        .par_iter()
        .filter_map(|column| {
            let values = present(column.as_numeric()?);
            Some(NumericStatistics {
                column: column.name().to_string(),
                mean: mean(&values),
                median: median(&values),
                std_dev: sample_std(&values),
                missing_count: column.missing_count(),
            })
        })
        .collect();

    BasicStatistics { columns }
}

pub fn profile_columns(table: &Table) -> Result<Vec<ColumnProfile>, EngineError> {
    ensure_columns(table, "profile_columns")?;

    Ok(table
        .columns()
        .par_iter()
        .map(|column| {
            let detail = match column.data() {
                ColumnData::Numeric(values) => {
                    let values = present(values);
                    ProfileDetail::Numeric {
                        mean: mean(&values),
                        median: median(&values),
                        std_dev: sample_std(&values),
                    }
                }
                ColumnData::Categorical(values) => ProfileDetail::Categorical {
                    frequencies: value_counts(values.iter().flatten().map(String::as_str)),
                },
            };
            ColumnProfile {
                name: column.name().to_string(),
                kind: column.kind(),
                missing_count: column.missing_count(),
                detail,
            }
        })
        .collect())
}
