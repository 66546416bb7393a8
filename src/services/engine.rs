//! Explicit request objects for the profiler and chart planner, so callers
//! describe what to compute instead of driving it through UI state.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::services::charts::{self, ChartRequest, ChartSpec};
use crate::services::profiler::{self, BasicStatistics, ColumnProfile, DatasetSummary};
use crate::services::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AnalysisRequest {
    Describe,
    BasicStatistics,
    ColumnProfiles,
    Chart { chart: ChartRequest },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", content = "result", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Describe(DatasetSummary),
    BasicStatistics(BasicStatistics),
    ColumnProfiles(Vec<ColumnProfile>),
    Chart(ChartSpec),
}

pub fn dispatch(table: &Table, request: &AnalysisRequest) -> Result<AnalysisOutput, EngineError> {
    let start = std::time::Instant::now();
    let output = match request {
        AnalysisRequest::Describe => AnalysisOutput::Describe(profiler::describe(table)?),
        AnalysisRequest::BasicStatistics => {
            AnalysisOutput::BasicStatistics(profiler::basic_statistics(table))
        }
        AnalysisRequest::ColumnProfiles => {
            AnalysisOutput::ColumnProfiles(profiler::profile_columns(table)?)
        }
        AnalysisRequest::Chart { chart } => AnalysisOutput::Chart(charts::plan(table, chart)?),
    };
    tracing::debug!("{:?} finished in {:?}", request, start.elapsed());
    Ok(output)
}
