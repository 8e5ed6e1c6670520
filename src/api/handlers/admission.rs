use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::waitlist::{party_to_response, WaitingResponse};
use crate::admission;
use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Seconds until the current code window expires
    pub expires_in: u64,
    pub party_id: u64,
    pub qr_url: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a fresh admission token (QR payload) for a party. Clients poll
/// this as the 30-second window rolls over.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<TokenResponse>>, ApiError> {
    let issued = admission::issue_token(&state.waitlist, id)?;
    Ok(JSend::success(TokenResponse {
        expires_in: issued.expires_in,
        party_id: issued.party_id,
        qr_url: issued.qr_url,
        token: issued.token,
    }))
}

/// Verify a scanned admission token. Every rejection is the same 401; the
/// response never says which check failed. Admission itself (confirming
/// arrival) is a separate, explicit call.
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<Json<JSend<WaitingResponse>>, ApiError> {
    match admission::verify_token(&state.waitlist, &req.token)? {
        Some(party) => Ok(JSend::success(party_to_response(&state, &party))),
        None => Err(ApiError::unauthorized("Invalid admission token")),
    }
}
