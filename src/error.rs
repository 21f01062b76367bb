//! Error Types
//!
//! Domain-level error taxonomy shared by the service layer and the web layer.
//! Each variant maps to a conventional REST status code when rendered.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

use crate::database::DatabaseError;

#[derive(Debug)]
pub enum ApiError {
    /// Wrong role or non-owner.
    Forbidden(String),
    /// Referenced course/lesson/user does not exist.
    NotFound(String),
    /// Missing or malformed required fields.
    InvalidArgument(String),
    /// A second enrollment attempt on the same course.
    AlreadyEnrolled,
    /// Certificate generation attempted without meeting eligibility.
    PreconditionFailed(String),
    /// Underlying store failure.
    Database(DatabaseError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Forbidden(msg) => write!(f, "{}", msg),
            ApiError::NotFound(msg) => write!(f, "{}", msg),
            ApiError::InvalidArgument(msg) => write!(f, "{}", msg),
            ApiError::AlreadyEnrolled => write!(f, "Already enrolled in this course"),
            ApiError::PreconditionFailed(msg) => write!(f, "{}", msg),
            ApiError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::NotFound(msg),
            err => ApiError::Database(err),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadyEnrolled => StatusCode::BAD_REQUEST,
            ApiError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(err) = &self {
            tracing::error!(error = %err, "Request failed with database error");
        }
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::AlreadyEnrolled.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PreconditionFailed("not done".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_database_not_found_becomes_not_found() {
        let err = ApiError::from(DatabaseError::NotFound("Course not found".into()));
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
