use axum::{
    BoxError, Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use shelf::{app::AppError, query::ParseSortOrderError};

/// Every failed request answers with `{"error": "..."}`.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    BadRequest(String),
    TimedOut,
    Internal,
}

/// Turns failures raised by middleware (the request timeout) into the
/// usual error body.
pub async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
        ApiError::TimedOut
    } else {
        tracing::error!(error = %err, "unhandled middleware error");
        ApiError::Internal
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        ApiError::App(value)
    }
}

impl From<ParseSortOrderError> for ApiError {
    fn from(value: ParseSortOrderError) -> Self {
        ApiError::BadRequest(value.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::TimedOut => (
                StatusCode::REQUEST_TIMEOUT,
                "Request timed out".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::App(app_error) => match app_error {
                AppError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.to_string()),
                AppError::NotFound { id } => {
                    tracing::debug!(id = %id, "book not found");
                    (StatusCode::NOT_FOUND, "Book not found".to_string())
                }
                AppError::Database(database_error) => {
                    tracing::error!(error = ?database_error, "database failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
