//! REST API for production figures and installation intake.
//!
//! Production endpoints:
//! - `GET /api/production/chart`: gross production chart
//! - `GET /api/production/pv`: photovoltaic series
//! - `GET /api/production/pie`: latest-year breakdown
//! - `POST /api/production/installations`: one-shot registration
//!
//! Intake endpoints:
//! - `POST /api/intake`: open a session
//! - `GET /api/intake/{session_id}`: current form, `?step=N` to revisit
//! - `POST /api/intake/{session_id}`: submit a step

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::config::AggregationConfig;
use crate::store::ProductionStore;
use crate::workflow::SessionStore;

pub use types::{ErrorResponse, FieldErrorsResponse, IntakeResponse, SessionCreated};

/// Application state shared across all request handlers.
///
/// Stores synchronize internally, so the state itself is wrapped in a plain
/// `Arc`.
pub struct AppState {
    /// Yearly records and installations.
    pub store: Box<dyn ProductionStore>,
    /// In-progress intake forms.
    pub sessions: Box<dyn SessionStore>,
    /// Chart, series and breakdown parameters.
    pub aggregation: AggregationConfig,
}

impl AppState {
    pub fn new(
        store: Box<dyn ProductionStore>,
        sessions: Box<dyn SessionStore>,
        aggregation: AggregationConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            aggregation,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/production/chart", get(handlers::get_production_chart))
        .route("/api/production/pv", get(handlers::get_pv_series))
        .route("/api/production/pie", get(handlers::get_production_breakdown))
        .route(
            "/api/production/installations",
            post(handlers::create_installation),
        )
        .route("/api/intake", post(handlers::start_intake))
        .route(
            "/api/intake/{session_id}",
            get(handlers::get_intake).post(handlers::submit_intake),
        )
        .with_state(state)
}

/// Binds to the given address and serves the API until the process stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
