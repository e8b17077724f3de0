//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use super::AppState;
use super::types::{ApiError, FieldErrorsResponse, IntakeResponse, SessionCreated, StepQuery};
use crate::aggregate::{Aggregator, ProductionBreakdown, ProductionChart};
use crate::estimator::RooftopEstimator;
use crate::store::ProductionStore;
use crate::workflow::{
    IntakeFields, IntakeForm, IntakeWorkflow, SessionStore, StepSubmission, SubmitOutcome,
    validated_installation,
};

fn aggregator(state: &AppState) -> Aggregator<'_, dyn ProductionStore, RooftopEstimator> {
    Aggregator::new(state.store.as_ref(), RooftopEstimator, &state.aggregation)
}

fn workflow(state: &AppState) -> IntakeWorkflow<'_, dyn ProductionStore, dyn SessionStore> {
    IntakeWorkflow::new(state.store.as_ref(), state.sessions.as_ref())
}

/// `GET /api/production/chart` → gross production, last year estimated.
pub async fn get_production_chart(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProductionChart>, ApiError> {
    Ok(Json(aggregator(&state).build_production_chart()?))
}

/// `GET /api/production/pv` → photovoltaic window, last year estimated.
pub async fn get_pv_series(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProductionChart>, ApiError> {
    Ok(Json(aggregator(&state).build_pv_series()?))
}

/// `GET /api/production/pie` → latest-year breakdown, 404 without data.
pub async fn get_production_breakdown(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProductionBreakdown>, ApiError> {
    Ok(Json(aggregator(&state).build_production_breakdown()?))
}

/// `POST /api/production/installations` registers a complete payload in one
/// request.
///
/// 201 + registration number, or 422 + field errors.
pub async fn create_installation(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<IntakeFields>,
) -> Result<Response, ApiError> {
    let installation = match validated_installation(&fields) {
        Ok(installation) => installation,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FieldErrorsResponse { errors }),
            )
                .into_response());
        }
    };
    let registration_number = state.store.insert_installation(&installation)?;
    info!(registration_number, "installation registered");
    Ok((StatusCode::CREATED, Json(registration_number)).into_response())
}

/// `POST /api/intake` → 201 + fresh session id.
pub async fn start_intake(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let session_id = workflow(&state).start()?;
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

/// `GET /api/intake/{session_id}?step=N` → accumulated form.
pub async fn get_intake(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<StepQuery>,
) -> Result<Json<IntakeForm>, ApiError> {
    Ok(Json(workflow(&state).view(&session_id, query.step)?))
}

/// `POST /api/intake/{session_id}` submits one step.
///
/// 200 on advance, step back or commit; 422 when the step is rejected.
pub async fn submit_intake(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(submission): Json<StepSubmission>,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let outcome = workflow(&state).submit(&session_id, &submission)?;
    let status = match outcome {
        SubmitOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };
    Ok((status, Json(IntakeResponse::from(outcome))))
}
