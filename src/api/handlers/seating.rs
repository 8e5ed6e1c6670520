use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::storage::models::{DiningTable, TableStatus};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TableStatusUpdateRequest {
    pub status: TableStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TableResponse {
    pub capacity: u32,
    pub current_party: Option<u64>,
    pub id: u64,
    pub status: TableStatus,
    pub table_number: u32,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<TableResponse>>>, ApiError> {
    let tables = state.seating.list();
    Ok(JSend::success(
        tables.iter().map(table_to_response).collect(),
    ))
}

/// Operator status change: bus an emptied table (OCCUPIED -> CLEANING) or
/// reopen it (-> EMPTY). Seating a party goes through the waitlist's
/// assign-table flow, not this endpoint.
pub async fn update_table_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<TableStatusUpdateRequest>,
) -> Result<Json<JSend<TableResponse>>, ApiError> {
    if req.status == TableStatus::Occupied {
        return Err(ApiError::bad_request(
            "Tables become occupied by seating a party",
        ));
    }

    let table = state.seating.update_status(id, req.status)?;
    Ok(JSend::success(table_to_response(&table)))
}

// ============================================================================
// Helpers
// ============================================================================

fn table_to_response(table: &DiningTable) -> TableResponse {
    TableResponse {
        capacity: table.capacity,
        current_party: table.current_party,
        id: table.id,
        status: table.status,
        table_number: table.table_number,
    }
}
