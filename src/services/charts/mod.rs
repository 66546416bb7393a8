//! Chart planning: validates column selections and derives the series a
//! renderer draws. Numeric aggregations skip missing values; an aggregation
//! with nothing left to aggregate yields an empty series, not an error.

pub mod types;

use std::collections::{BTreeMap, HashMap};

use crate::error::EngineError;
use crate::services::profiler::stats::{
    mean, pearson, present, quantile_sorted, sorted, value_counts,
};
use crate::services::table::utils::parse_number;
use crate::services::table::{Column, ColumnKind, Table};
pub use types::{
    BoxSummary, ChartKind, ChartRequest, ChartSeries, ChartSpec, DEFAULT_BINS, DEFAULT_TOP_N,
};

const WHISKER_IQR: f64 = 1.5;

pub fn plan(table: &Table, request: &ChartRequest) -> Result<ChartSpec, EngineError> {
    tracing::debug!("Planning {} chart", request.kind().operation());
    match request {
        ChartRequest::Histogram { column, bins } => histogram(table, column, *bins),
        ChartRequest::PieChart { column } => pie_chart(table, column),
        ChartRequest::GroupedBarChart {
            group_column,
            value_column,
        } => grouped_bar_chart(table, group_column, value_column),
        ChartRequest::CorrelationHeatmap => correlation_heatmap(table),
        ChartRequest::BoxPlot {
            column,
            group_column,
        } => box_plot(table, column, group_column.as_deref()),
        ChartRequest::ScatterPlot { x_column, y_column } => scatter_plot(table, x_column, y_column),
        ChartRequest::TopCategoriesBar { column, top_n } => {
            top_categories_bar(table, column, *top_n)
        }
    }
}

fn lookup<'t>(table: &'t Table, kind: ChartKind, name: &str) -> Result<&'t Column, EngineError> {
    table.column(name).ok_or_else(|| EngineError::InvalidColumn {
        operation: kind.operation(),
        column: name.to_string(),
    })
}

fn expect_kind<'t>(
    table: &'t Table,
    kind: ChartKind,
    name: &str,
    expected: ColumnKind,
) -> Result<&'t Column, EngineError> {
    let column = lookup(table, kind, name)?;
    if column.kind() != expected {
        return Err(EngineError::TypeMismatch {
            operation: kind.operation(),
            column: name.to_string(),
            expected,
            actual: column.kind(),
        });
    }
    Ok(column)
}

fn numeric<'t>(
    table: &'t Table,
    kind: ChartKind,
    name: &str,
) -> Result<&'t [Option<f64>], EngineError> {
    let column = expect_kind(table, kind, name, ColumnKind::Numeric)?;
    Ok(column.as_numeric().unwrap_or_default())
}

fn categorical<'t>(
    table: &'t Table,
    kind: ChartKind,
    name: &str,
) -> Result<&'t [Option<String>], EngineError> {
    let column = expect_kind(table, kind, name, ColumnKind::Categorical)?;
    Ok(column.as_categorical().unwrap_or_default())
}

fn spec(
    kind: ChartKind,
    title: String,
    x_label: Option<&str>,
    y_label: Option<&str>,
    series: ChartSeries,
) -> ChartSpec {
    ChartSpec {
        kind,
        title,
        x_label: x_label.map(str::to_string),
        y_label: y_label.map(str::to_string),
        series,
    }
}

/// Equal-width bins over `[min, max]` of the column's present finite values.
pub fn histogram(table: &Table, column: &str, bins: usize) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::Histogram;
    let mut values = present(numeric(table, kind, column)?);
    let before = values.len();
    values.retain(|value| value.is_finite());
    if values.len() < before {
        tracing::debug!("Histogram of {} skips {} infinite values", column, before - values.len());
    }
    if bins == 0 {
        return Err(EngineError::InvalidParameter {
            operation: kind.operation(),
            message: "bins must be at least 1".to_string(),
        });
    }

    let series = if values.is_empty() {
        ChartSeries::Bins {
            edges: Vec::new(),
            counts: Vec::new(),
        }
    } else {
        let (edges, counts) = bin_values(&values, bins);
        ChartSeries::Bins { edges, counts }
    };

    Ok(spec(
        kind,
        format!("Histogram of {}", column),
        Some(column),
        Some("Frequency"),
        series,
    ))
}

fn bin_values(values: &[f64], bins: usize) -> (Vec<f64>, Vec<usize>) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let span = high - low;

    // When `high - low` overflows, interpolate without forming the span.
    let at = |t: f64| {
        if span.is_finite() {
            low + span * t
        } else {
            low * (1.0 - t) + high * t
        }
    };
    let fraction = |value: f64| {
        if span.is_finite() {
            (value - low) / span
        } else {
            (value / 2.0 - low / 2.0) / (high / 2.0 - low / 2.0)
        }
    };

    let mut edges: Vec<f64> = (0..=bins).map(|i| at(i as f64 / bins as f64)).collect();
    edges[0] = low;
    edges[bins] = high;

    let mut counts = vec![0usize; bins];
    for value in values {
        // the last bin is closed on the right
        let slot = ((fraction(*value) * bins as f64).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    (edges, counts)
}

pub fn pie_chart(table: &Table, column: &str) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::PieChart;
    let values = categorical(table, kind, column)?;
    let frequencies = value_counts(values.iter().flatten().map(String::as_str));

    let (labels, counts) = frequencies
        .into_iter()
        .map(|entry| (entry.value, entry.count))
        .unzip();

    Ok(spec(
        kind,
        format!("Distribution of {}", column),
        None,
        None,
        ChartSeries::Counts { labels, counts },
    ))
}

/// Mean of `value_column` per distinct value of `group_column`, ordered by group label.
pub fn grouped_bar_chart(
    table: &Table,
    group_column: &str,
    value_column: &str,
) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::GroupedBarChart;
    let groups = categorical(table, kind, group_column)?;
    let values = numeric(table, kind, value_column)?;

    let mut buckets: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (group, value) in groups.iter().zip(values) {
        let Some(group) = group else { continue };
        let bucket = buckets.entry(group.as_str()).or_default();
        if let Some(value) = value {
            bucket.push(*value);
        }
    }

    let (labels, means) = buckets
        .into_iter()
        .map(|(group, values)| (group.to_string(), mean(&values)))
        .unzip();

    Ok(spec(
        kind,
        format!("Average {} by {}", value_column, group_column),
        Some(group_column),
        Some(format!("Average {}", value_column).as_str()),
        ChartSeries::Bars {
            labels,
            values: means,
        },
    ))
}

/// Pairwise-complete Pearson correlation between every pair of numeric columns.
pub fn correlation_heatmap(table: &Table) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::CorrelationHeatmap;
    let columns: Vec<&Column> = table.numeric_columns().collect();
    if columns.len() < 2 {
        return Err(EngineError::InsufficientColumns {
            operation: kind.operation(),
            required: 2,
            found: columns.len(),
        });
    }

    let series = if table.row_count() == 0 {
        ChartSeries::Matrix {
            columns: Vec::new(),
            values: Vec::new(),
        }
    } else {
        let data: Vec<&[Option<f64>]> = columns
            .iter()
            .map(|column| column.as_numeric().unwrap_or_default())
            .collect();
        let n = data.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let pairs: Vec<(f64, f64)> = data[i]
                    .iter()
                    .zip(data[j])
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .collect();
                let r = pearson(&pairs);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        ChartSeries::Matrix {
            columns: columns.iter().map(|c| c.name().to_string()).collect(),
            values,
        }
    };

    Ok(spec(
        kind,
        "Correlation Heatmap".to_string(),
        None,
        None,
        series,
    ))
}

/// Quartile summaries of `column`, optionally one per value of `group_column`.
///
/// Categorical groups keep first-appearance order, numeric groups ascend.
pub fn box_plot(
    table: &Table,
    column: &str,
    group_column: Option<&str>,
) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::BoxPlot;
    let values = numeric(table, kind, column)?;

    let Some(group_name) = group_column else {
        let boxes = box_summary(None, &present(values)).into_iter().collect();
        return Ok(spec(
            kind,
            format!("Boxplot of {}", column),
            None,
            Some(column),
            ChartSeries::Boxes { boxes },
        ));
    };

    let groups = lookup(table, kind, group_name)?;
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<f64>> = HashMap::new();
    for (row, value) in values.iter().enumerate() {
        let Some(label) = groups.display_value(row) else {
            continue;
        };
        let bucket = buckets.entry(label).or_insert_with_key(|label| {
            order.push(label.clone());
            Vec::new()
        });
        if let Some(value) = value {
            bucket.push(*value);
        }
    }

    if groups.kind() == ColumnKind::Numeric {
        order.sort_by(|a, b| {
            let a = parse_number(a).unwrap_or(f64::NAN);
            let b = parse_number(b).unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }

    let boxes = order
        .into_iter()
        .filter_map(|label| {
            let values = buckets.remove(&label).unwrap_or_default();
            box_summary(Some(label), &values)
        })
        .collect();

    Ok(spec(
        kind,
        format!("Boxplot of {} by {}", column, group_name),
        Some(group_name),
        Some(column),
        ChartSeries::Boxes { boxes },
    ))
}

fn box_summary(group: Option<String>, values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    let ordered = sorted(values);
    let q1 = quantile_sorted(&ordered, 0.25);
    let q3 = quantile_sorted(&ordered, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - WHISKER_IQR * iqr;
    let upper_fence = q3 + WHISKER_IQR * iqr;

    let inside = || {
        ordered
            .iter()
            .copied()
            .filter(move |v| *v >= lower_fence && *v <= upper_fence)
    };
    let lower_whisker = inside().next().unwrap_or(q1);
    let upper_whisker = inside().last().unwrap_or(q3);
    let outliers = ordered
        .iter()
        .copied()
        .filter(|v| *v < lower_fence || *v > upper_fence)
        .collect();

    Some(BoxSummary {
        group,
        count: ordered.len(),
        min: ordered[0],
        q1,
        median: quantile_sorted(&ordered, 0.5),
        q3,
        max: ordered[ordered.len() - 1],
        lower_fence,
        upper_fence,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// Row-wise (x, y) pairs; rows missing either value are dropped.
pub fn scatter_plot(table: &Table, x_column: &str, y_column: &str) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::ScatterPlot;
    let xs = numeric(table, kind, x_column)?;
    let ys = numeric(table, kind, y_column)?;

    let (x, y) = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    Ok(spec(
        kind,
        format!("{} vs {}", y_column, x_column),
        Some(x_column),
        Some(y_column),
        ChartSeries::Points { x, y },
    ))
}

pub fn top_categories_bar(
    table: &Table,
    column: &str,
    top_n: usize,
) -> Result<ChartSpec, EngineError> {
    let kind = ChartKind::TopCategoriesBar;
    let values = categorical(table, kind, column)?;
    let mut frequencies = value_counts(values.iter().flatten().map(String::as_str));
    frequencies.truncate(top_n);

    let (labels, counts) = frequencies
        .into_iter()
        .map(|entry| (entry.value, entry.count))
        .unzip();

    Ok(spec(
        kind,
        format!("Top {} Frequent Categories in {}", top_n, column),
        Some(column),
        Some("Count"),
        ChartSeries::Counts { labels, counts },
    ))
}
