use crate::config::ConfigError;
use crate::portal::{AccessError, PortalError, RepositoryError};
use crate::telemetry::TelemetryError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error(transparent)]
    Portal(#[from] PortalError),
}

impl From<AccessError> for AppError {
    fn from(value: AccessError) -> Self {
        Self::Portal(PortalError::Access(value))
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Portal(PortalError::Repository(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Portal(PortalError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Portal(PortalError::Validation(rejection.body_text()))
    }
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Portal(err) => match err {
                PortalError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                PortalError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                PortalError::InvalidTransition { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_TRANSITION")
                }
                PortalError::NotEditable { .. } => (StatusCode::CONFLICT, "NOT_EDITABLE"),
                PortalError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                PortalError::NotApproved { .. } => (StatusCode::FORBIDDEN, "CENTER_NOT_APPROVED"),
                PortalError::Access(AccessError::Forbidden(_)) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN")
                }
                PortalError::Access(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                PortalError::Repository(repo) => match repo {
                    RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    RepositoryError::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
                    RepositoryError::Stale => (StatusCode::CONFLICT, "STALE_RECORD"),
                    RepositoryError::RegistrationClosed { .. } => {
                        (StatusCode::CONFLICT, "REGISTRATION_CLOSED")
                    }
                    RepositoryError::AlreadyRegistered => {
                        (StatusCode::CONFLICT, "ALREADY_REGISTERED")
                    }
                    RepositoryError::CapacityReached { .. } => {
                        (StatusCode::CONFLICT, "CAPACITY_REACHED")
                    }
                    RepositoryError::CapacityBelowUsage { .. } => {
                        (StatusCode::CONFLICT, "CAPACITY_BELOW_USAGE")
                    }
                    RepositoryError::Unavailable(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                },
            },
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::Server(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "an internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "code": code, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_map_to_conflict() {
        let err = AppError::from(RepositoryError::CapacityReached { capacity: 5 });
        assert_eq!(err.classify(), (StatusCode::CONFLICT, "CAPACITY_REACHED"));
    }

    #[test]
    fn missing_identity_is_unauthorized_and_forbidden_is_403() {
        let missing = AppError::from(AccessError::MissingIdentity);
        assert_eq!(missing.classify().0, StatusCode::UNAUTHORIZED);

        let forbidden = AppError::from(AccessError::Forbidden("reviewers only".to_string()));
        assert_eq!(forbidden.classify().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn repository_outage_hides_details() {
        let err = AppError::from(RepositoryError::Unavailable("disk full".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
