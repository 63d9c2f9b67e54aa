use crate::engine::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rollcall_core::{LedgerError, RosterError};
use thiserror::Error;

/// Workflow failures, each carrying the message shown to the client.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    MissingField(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingField(_) | ServiceError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Decode(_) | ServiceError::Storage(_) | ServiceError::Engine(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound => ServiceError::NotFound("Attendance data not found".into()),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<RosterError> for ServiceError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::InvalidName(name) => ServiceError::InvalidName(name),
            RosterError::NotFound(path) => ServiceError::NotFound(path),
            RosterError::Io(e) => ServiceError::Storage(e.to_string()),
        }
    }
}

/// Plain-text error body.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Same error rendered as `{"error": "..."}` for the JSON endpoints.
pub struct JsonError(pub ServiceError);

impl From<ServiceError> for JsonError {
    fn from(err: ServiceError) -> Self {
        JsonError(err)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (self.0.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::MissingField("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(LedgerError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Decode("Error decoding image".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::from(RosterError::InvalidName("..".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_ledger_not_found_message() {
        let err = ServiceError::from(LedgerError::NotFound);
        assert_eq!(err.to_string(), "Attendance data not found");
    }
}
