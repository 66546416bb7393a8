use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 10;
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    PieChart,
    GroupedBarChart,
    CorrelationHeatmap,
    BoxPlot,
    ScatterPlot,
    TopCategoriesBar,
}

impl ChartKind {
    /// Operation name used in error messages and logs.
    pub fn operation(self) -> &'static str {
        match self {
            ChartKind::Histogram => "histogram",
            ChartKind::PieChart => "pie_chart",
            ChartKind::GroupedBarChart => "grouped_bar_chart",
            ChartKind::CorrelationHeatmap => "correlation_heatmap",
            ChartKind::BoxPlot => "box_plot",
            ChartKind::ScatterPlot => "scatter_plot",
            ChartKind::TopCategoriesBar => "top_categories_bar",
        }
    }
}

/// Five-number summary plus Tukey fences for one box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub group: Option<String>,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSeries {
    /// `edges.len() == counts.len() + 1` unless both are empty.
    Bins { edges: Vec<f64>, counts: Vec<usize> },
    Counts { labels: Vec<String>, counts: Vec<usize> },
    Bars { labels: Vec<String>, values: Vec<f64> },
    /// Square matrix, `values[i][j]` relates `columns[i]` and `columns[j]`.
    Matrix { columns: Vec<String>, values: Vec<Vec<f64>> },
    Boxes { boxes: Vec<BoxSummary> },
    Points { x: Vec<f64>, y: Vec<f64> },
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartSeries::Bins { counts, .. } => counts.is_empty(),
            ChartSeries::Counts { labels, .. } => labels.is_empty(),
            ChartSeries::Bars { labels, .. } => labels.is_empty(),
            ChartSeries::Matrix { columns, .. } => columns.is_empty(),
            ChartSeries::Boxes { boxes } => boxes.is_empty(),
            ChartSeries::Points { x, .. } => x.is_empty(),
        }
    }
}

/// Everything a renderer needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub series: ChartSeries,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Share of each slice in percent (0 to 100, summing to 100) for
    /// count-based series; empty for other shapes or when every count is zero.
    pub fn percentages(&self) -> Vec<f64> {
        match &self.series {
            ChartSeries::Counts { counts, .. } => {
                let total: usize = counts.iter().sum();
                if total == 0 {
                    return Vec::new();
                }
                counts
                    .iter()
                    .map(|&count| count as f64 * 100.0 / total as f64)
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

fn default_bins() -> usize {
    DEFAULT_BINS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// A chart request as sent by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRequest {
    Histogram {
        column: String,
        #[serde(default = "default_bins")]
        bins: usize,
    },
    PieChart {
        column: String,
    },
    GroupedBarChart {
        group_column: String,
        value_column: String,
    },
    CorrelationHeatmap,
    BoxPlot {
        column: String,
        #[serde(default)]
        group_column: Option<String>,
    },
    ScatterPlot {
        x_column: String,
        y_column: String,
    },
    TopCategoriesBar {
        column: String,
        #[serde(default = "default_top_n")]
        top_n: usize,
    },
}

impl ChartRequest {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartRequest::Histogram { .. } => ChartKind::Histogram,
            ChartRequest::PieChart { .. } => ChartKind::PieChart,
            ChartRequest::GroupedBarChart { .. } => ChartKind::GroupedBarChart,
            ChartRequest::CorrelationHeatmap => ChartKind::CorrelationHeatmap,
            ChartRequest::BoxPlot { .. } => ChartKind::BoxPlot,
            ChartRequest::ScatterPlot { .. } => ChartKind::ScatterPlot,
            ChartRequest::TopCategoriesBar { .. } => ChartKind::TopCategoriesBar,
        }
    }
}
