use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use exportdesk_core::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Missing or malformed x-user-id header")]
    Unauthenticated,

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(CoreError::Validation(_)) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Core(CoreError::Authorization) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Core(CoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Core(CoreError::Conflict(_)) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Core(CoreError::Store(e)) => {
                tracing::error!(error = %e, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage temporarily unavailable, retry later".to_string(),
                )
            }
            ApiError::Core(CoreError::DataIntegrity(detail)) => {
                tracing::error!(detail = %detail, "data integrity violation");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(
            status_of(CoreError::validation("empty").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(CoreError::Authorization.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(CoreError::not_found("RFQ", "x").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::Conflict("stale".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::DataIntegrity("status 'x'".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::Store(exportdesk_store::StoreError::Unavailable("down".into())).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(ApiError::Unauthenticated), StatusCode::UNAUTHORIZED);
    }
}
