use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::PunchType;
use crate::sequencer::SequenceError;
use crate::store::StoreError;

/// Every failure a core operation can report.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),

    #[error("corrupted punch history: {0}")]
    Sequence(#[from] SequenceError),

    #[error("a {0} punch already exists for this day")]
    DuplicatePunch(PunchType),

    #[error("journey already complete for today")]
    JourneyComplete,

    #[error("another punch operation for this employee and day is in progress")]
    PunchInFlight,

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timestamp falls outside the punch's original day")]
    InvalidTimestamp,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("could not generate a unique registration number after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AttendanceError::NotFound(what),
            StoreError::Conflict(what) => AttendanceError::Conflict(what),
            StoreError::MatriculaTaken(matricula) => {
                AttendanceError::Conflict(format!("registration number {matricula}"))
            }
            StoreError::Unavailable(why) => AttendanceError::BackendUnavailable(why),
        }
    }
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        AttendanceError::Validation(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        AttendanceError::Permission(message.into())
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::Validation(_) => "VALIDATION",
            AttendanceError::Sequence(_) => "SEQUENCE",
            AttendanceError::DuplicatePunch(_) => "DUPLICATE_PUNCH",
            AttendanceError::JourneyComplete => "JOURNEY_COMPLETE",
            AttendanceError::PunchInFlight => "PUNCH_IN_FLIGHT",
            AttendanceError::Permission(_) => "PERMISSION",
            AttendanceError::NotFound(_) => "NOT_FOUND",
            AttendanceError::InvalidTimestamp => "INVALID_TIMESTAMP",
            AttendanceError::InvalidCredentials => "INVALID_CREDENTIALS",
            AttendanceError::Conflict(_) => "CONFLICT",
            AttendanceError::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            AttendanceError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_) | AttendanceError::InvalidTimestamp => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AttendanceError::Permission(_) => StatusCode::FORBIDDEN,
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::DuplicatePunch(_)
            | AttendanceError::JourneyComplete
            | AttendanceError::PunchInFlight
            | AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::Sequence(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::GenerationExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AttendanceError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay in the logs.
        let message = match self {
            AttendanceError::BackendUnavailable(_) => "Storage temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_core_kinds() {
        assert!(matches!(
            AttendanceError::from(StoreError::Unavailable("down".into())),
            AttendanceError::BackendUnavailable(_)
        ));
        assert!(matches!(
            AttendanceError::from(StoreError::NotFound("punch x".into())),
            AttendanceError::NotFound(_)
        ));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            AttendanceError::permission("HR/Admin only").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AttendanceError::JourneyComplete.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AttendanceError::BackendUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
