//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::events::BusStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub events: BusStats,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: "doc-portal-server",
        events: state.bus().stats(),
    })
}
