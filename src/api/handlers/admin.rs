use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub instance_id: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub arrived_today: u64,
    pub called: u64,
    pub tables_occupied: u64,
    pub tables_total: u64,
    pub waiting: u64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged_parties: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        instance_id: state.config.node.id.clone(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Operator dashboard counters.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<JSend<StatsResponse>> {
    let waitlist = state.waitlist.stats();
    let (tables_occupied, tables_total) = state.seating.occupancy();

    JSend::success(StatsResponse {
        arrived_today: waitlist.arrived_today,
        called: waitlist.called,
        tables_occupied,
        tables_total,
        waiting: waitlist.waiting,
    })
}

/// Drop all party records. Only routed when TEST_MODE is enabled.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let purged_parties = state.waitlist.purge()?;
    Ok(JSend::success(PurgeResponse { purged_parties }))
}
