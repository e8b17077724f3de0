//! API request and response types.
//!
//! Chart, breakdown and form payloads are the library types serialized
//! as-is; this module only adds the envelopes around them.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::aggregate::AggregateError;
use crate::store::StoreError;
use crate::workflow::{FieldError, IntakeForm, SubmitOutcome, WorkflowError};

/// Optional step override when fetching an intake session.
#[derive(Debug, Deserialize)]
pub struct StepQuery {
    /// Requested step; clamped into `[1, 4]`.
    pub step: Option<i64>,
}

/// Body of `POST /api/intake`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

/// Result of a step submission.
#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    /// `advanced`, `stepped_back`, `rejected` or `committed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<IntakeForm>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<i64>,
}

impl From<SubmitOutcome> for IntakeResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        let (status, form, errors, registration_number) = match outcome {
            SubmitOutcome::Advanced(form) => ("advanced", Some(form), Vec::new(), None),
            SubmitOutcome::SteppedBack(form) => ("stepped_back", Some(form), Vec::new(), None),
            SubmitOutcome::Rejected { form, errors } => ("rejected", Some(form), errors, None),
            SubmitOutcome::Committed {
                registration_number,
            } => ("committed", None, Vec::new(), Some(registration_number)),
        };
        Self {
            status,
            form,
            errors,
            registration_number,
        }
    }
}

/// Field errors returned with 422.
#[derive(Debug, Serialize)]
pub struct FieldErrorsResponse {
    pub errors: Vec<FieldError>,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Handler failure mapped onto an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Internal(message) => {
                error!(%message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NoData => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self::Internal(err.to_string())
    }
}
