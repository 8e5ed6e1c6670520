use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::storage::models::{PartyStatus, QueuedParty};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct JoinRequest {
    pub guest_id: u64,
    pub head_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct AssignTableRequest {
    pub table_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<PartyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WaitingResponse {
    pub called_at: Option<String>,
    pub estimated_minutes: u64,
    pub guest_id: u64,
    pub head_count: u32,
    pub joined_at: String,
    pub party_id: u64,
    /// Present only while the party is WAITING
    pub rank: Option<u64>,
    pub status: PartyStatus,
    pub ticket_number: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    if req.head_count == 0 {
        return Err(ApiError::bad_request("head_count must be greater than 0"));
    }

    let party = state.waitlist.join(req.guest_id, req.head_count)?;
    Ok(JSend::success(party_to_response(&state, &party)))
}

pub async fn get_guest_status(
    State(state): State<Arc<AppState>>,
    Path(guest_id): Path<u64>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    let party = state
        .waitlist
        .active_party_for_guest(guest_id)
        .ok_or_else(|| ApiError::not_found("No active party for this guest"))?;

    // Polling this endpoint doubles as the rank push trigger
    if party.status == PartyStatus::Waiting {
        state.waitlist.push_rank_update(party.id);
    }

    Ok(JSend::success(party_to_response(&state, &party)))
}

pub async fn list_waitlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<JSend<Vec<WaitingResponse>>>, ApiError> {
    let parties = state.waitlist.list(params.status);
    let items = parties
        .iter()
        .map(|party| party_to_response(&state, party))
        .collect();
    Ok(JSend::success(items))
}

pub async fn call_party(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    let party = state.waitlist.call(id)?;
    Ok(JSend::success(party_to_response(&state, &party)))
}

pub async fn confirm_arrival(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    let party = state.waitlist.confirm_arrival(id)?;
    Ok(JSend::success(party_to_response(&state, &party)))
}

pub async fn cancel_party(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    let party = state.waitlist.cancel(id)?;
    Ok(JSend::success(party_to_response(&state, &party)))
}

pub async fn assign_table(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<AssignTableRequest>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    let party = state
        .waitlist
        .assign_table(id, req.table_id, &state.seating)?;
    Ok(JSend::success(party_to_response(&state, &party)))
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn party_to_response(state: &AppState, party: &QueuedParty) -> WaitingResponse {
    let position = (party.status == PartyStatus::Waiting)
        .then(|| state.waitlist.position(party.id))
        .flatten();

    WaitingResponse {
        called_at: party.called_at.map(|t| t.to_rfc3339()),
        estimated_minutes: position.map(|p| p.estimated_minutes).unwrap_or(0),
        guest_id: party.guest_id,
        head_count: party.head_count,
        joined_at: party.joined_at.to_rfc3339(),
        party_id: party.id,
        rank: position.map(|p| p.rank),
        status: party.status,
        ticket_number: party.ticket_number,
    }
}
