use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polars::prelude::PolarsError;
use serde_json::json;
use thiserror::Error;

use crate::services::table::ColumnKind;

/// Structural problems found while assembling a [`Table`](crate::services::table::Table).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("failed to read workbook: {0}")]
    Xlsx(String),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Recoverable failures of a profiling or chart request.
///
/// Every variant names the operation that was running so the caller can show
/// the user which selection to fix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{operation}: the table has no columns")]
    EmptyTable { operation: &'static str },
    #[error("{operation}: column '{column}' does not exist")]
    InvalidColumn {
        operation: &'static str,
        column: String,
    },
    #[error("{operation}: column '{column}' is {actual}, expected {expected}")]
    TypeMismatch {
        operation: &'static str,
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },
    #[error("{operation}: needs at least {required} numeric columns, found {found}")]
    InsufficientColumns {
        operation: &'static str,
        required: usize,
        found: usize,
    },
    #[error("{operation}: {message}")]
    InvalidParameter {
        operation: &'static str,
        message: String,
    },
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::EmptyTable { .. } => "empty_table",
            EngineError::InvalidColumn { .. } => "invalid_column",
            EngineError::TypeMismatch { .. } => "type_mismatch",
            EngineError::InsufficientColumns { .. } => "insufficient_columns",
            EngineError::InvalidParameter { .. } => "invalid_parameter",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("Upload rejected: {0}")]
    Upload(#[from] BytesRejection),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::DatasetNotFound(_) => (StatusCode::NOT_FOUND, "dataset_not_found"),
            AppError::Upload(rejection) => (rejection.status(), "upload_rejected"),
            AppError::Ingest(_) => (StatusCode::BAD_REQUEST, "ingest_failed"),
            AppError::Engine(err) => {
                let status = match err {
                    EngineError::InvalidColumn { .. } => StatusCode::NOT_FOUND,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.kind())
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", kind, self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_name_operation_and_column() {
        let err = EngineError::TypeMismatch {
            operation: "scatter_plot",
            column: "city".to_string(),
            expected: ColumnKind::Numeric,
            actual: ColumnKind::Categorical,
        };
        assert_eq!(
            err.to_string(),
            "scatter_plot: column 'city' is categorical, expected numeric"
        );
        assert_eq!(err.kind(), "type_mismatch");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let missing = AppError::from(EngineError::InvalidColumn {
            operation: "histogram",
            column: "nope".to_string(),
        });
        assert_eq!(missing.status_and_kind().0, StatusCode::NOT_FOUND);

        let short = AppError::from(EngineError::InsufficientColumns {
            operation: "correlation_heatmap",
            required: 2,
            found: 1,
        });
        assert_eq!(
            short.status_and_kind(),
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_columns")
        );

        let ingest = AppError::from(IngestError::NoWorksheet);
        assert_eq!(ingest.status_and_kind().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn every_app_error_has_a_kind() {
        let missing = AppError::DatasetNotFound("sales_1".to_string());
        assert_eq!(
            missing.status_and_kind(),
            (StatusCode::NOT_FOUND, "dataset_not_found")
        );

        let internal = AppError::Internal("worker panicked".to_string());
        assert_eq!(
            internal.status_and_kind(),
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        );
    }
}
