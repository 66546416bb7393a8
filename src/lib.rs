//! Profiling and chart planning for uploaded tabular data.
//!
//! A [`Table`](services::table::Table) is ingested from CSV or XLSX bytes,
//! then profiled ([`services::profiler`]) or turned into renderer-ready
//! [`ChartSpec`](services::charts::ChartSpec)s ([`services::charts`]). The
//! HTTP layer in [`routes`] keeps uploaded tables in a per-process
//! [`DatasetStore`](services::dataset_store::DatasetStore).

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::dataset_store::DatasetStore;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub datasets: DatasetStore,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let datasets = DatasetStore::new(config.max_datasets, config.dataset_ttl);
        Self { config, datasets }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .merge(routes::routes())
        .merge(routes::datasets::routes())
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
