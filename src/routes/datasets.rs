use axum::{
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::{AppError, EngineError},
    models::{DatasetHandle, DeletedDataset, UploadQuery},
    services::{
        charts::{self, ChartRequest, ChartSpec},
        engine::{self, AnalysisOutput, AnalysisRequest},
        profiler::{self, BasicStatistics, ColumnProfile, DatasetSummary},
        table::{read_table, SourceFormat, Table},
    },
    AppState,
};

const DEFAULT_DATASET_NAME: &str = "dataset";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/datasets", post(upload_dataset))
        .route("/datasets/:id", put(replace_dataset).delete(delete_dataset))
        .route("/datasets/:id/describe", get(describe_dataset))
        .route("/datasets/:id/statistics", get(dataset_statistics))
        .route("/datasets/:id/columns", get(column_profiles))
        .route("/datasets/:id/charts", post(plan_chart))
        .route("/datasets/:id/analyze", post(analyze_dataset))
        .layer(cors)
}

async fn ingest(state: &AppState, body: Bytes) -> Result<(SourceFormat, Table), AppError> {
    let options = state.config.ingest_options();
    let format = SourceFormat::sniff(&body);
    let size = body.len();

    let start = std::time::Instant::now();
    let table = tokio::task::spawn_blocking(move || read_table(&body, &options)).await??;
    tracing::info!(
        "Parsed {:?} upload ({}KB): {} rows, {} columns in {:?}",
        format,
        size / 1024,
        table.row_count(),
        table.column_count(),
        start.elapsed()
    );

    Ok((format, table))
}

/// Runs an engine operation on a stored table off the async executor.
async fn run_engine<T, F>(state: &AppState, id: &str, job: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Table) -> Result<T, EngineError> + Send + 'static,
{
    let dataset = state
        .datasets
        .get(id)
        .ok_or_else(|| AppError::DatasetNotFound(id.to_string()))?;

    let output = tokio::task::spawn_blocking(move || job(&dataset.table)).await??;
    Ok(output)
}

fn upload_name(query: UploadQuery) -> Option<String> {
    query
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<DatasetHandle>), AppError> {
    let body = body?;
    let name = upload_name(query).unwrap_or_else(|| DEFAULT_DATASET_NAME.to_string());
    let (format, table) = ingest(&state, body).await?;

    let stored = state.datasets.insert(&name, format, table);
    tracing::info!("Registered dataset {}", stored.id);

    Ok((StatusCode::CREATED, Json(DatasetHandle::from(&stored))))
}

async fn replace_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DatasetHandle>, AppError> {
    let body = body?;
    let existing = state
        .datasets
        .get(&id)
        .ok_or_else(|| AppError::DatasetNotFound(id.clone()))?;
    let name = upload_name(query).unwrap_or_else(|| existing.name.clone());
    let (format, table) = ingest(&state, body).await?;

    let stored = state
        .datasets
        .replace(&id, &name, format, table)
        .ok_or_else(|| AppError::DatasetNotFound(id.clone()))?;
    tracing::info!("Replaced table of dataset {}", id);

    Ok(Json(DatasetHandle::from(&stored)))
}

async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedDataset>, AppError> {
    if !state.datasets.remove(&id) {
        return Err(AppError::DatasetNotFound(id));
    }
    tracing::info!("Dropped dataset {}", id);

    Ok(Json(DeletedDataset {
        dataset_id: id,
        deleted: true,
    }))
}

async fn describe_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, AppError> {
    let summary = run_engine(&state, &id, profiler::describe).await?;
    Ok(Json(summary))
}

async fn dataset_statistics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BasicStatistics>, AppError> {
    let stats = run_engine(&state, &id, |table| Ok(profiler::basic_statistics(table))).await?;
    Ok(Json(stats))
}

async fn column_profiles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ColumnProfile>>, AppError> {
    let profiles = run_engine(&state, &id, profiler::profile_columns).await?;
    Ok(Json(profiles))
}

async fn plan_chart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<ChartSpec>, AppError> {
    tracing::info!("Chart request {:?} on dataset {}", request.kind(), id);
    let spec = run_engine(&state, &id, move |table| charts::plan(table, &request)).await?;
    Ok(Json(spec))
}

async fn analyze_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisOutput>, AppError> {
    tracing::info!("Analysis request {:?} on dataset {}", request, id);
    let output = run_engine(&state, &id, move |table| engine::dispatch(table, &request)).await?;
    Ok(Json(output))
}
