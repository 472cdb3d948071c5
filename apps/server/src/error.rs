use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use echowatch_service::ServiceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Service(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            AppError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
            return HttpResponse::build(status).json(json!({ "error": "internal error" }));
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let invalid = AppError::from(ServiceError::InvalidSettings("interval".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let sort = AppError::from(ServiceError::InvalidSort("password".into()));
        assert_eq!(sort.status_code(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(ServiceError::NotFound(uuid::Uuid::nil()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let pool = AppError::from(ServiceError::Pool("exhausted".into()));
        assert_eq!(pool.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
