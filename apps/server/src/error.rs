use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cointracker_core::errors::{DatabaseError, Error as CoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound(_) | CoreError::Database(DatabaseError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        CoreError::SyncInProgress(_)
        | CoreError::ConstraintViolation(_)
        | CoreError::Database(DatabaseError::UniqueViolation(_)) => StatusCode::CONFLICT,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(e) => core_status(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cointracker_core::errors::ValidationError;

    #[test]
    fn test_core_status_mapping() {
        assert_eq!(
            core_status(&CoreError::NotFound("w".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            core_status(&CoreError::SyncInProgress("w".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            core_status(&CoreError::Database(DatabaseError::UniqueViolation(
                "wallets.address".into()
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            core_status(&CoreError::Validation(ValidationError::MissingField(
                "address".into()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            core_status(&CoreError::Database(DatabaseError::QueryFailed(
                "disk I/O error".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
