//! Admission tokens: QR payloads binding a one-time code to a queued party.
//!
//! The wire format is exactly `"<party-id-decimal>:<6-digit-code>"`. Any
//! other shape is malformed. Verification never reveals which check failed:
//! malformed input, an unknown party, a missing secret, a wrong code and a
//! party that is not CALLED all collapse to the same rejection.

use serde::Serialize;

use crate::queue::{QueueError, Waitlist};
use crate::storage::models::{PartyStatus, QueuedParty};
use crate::totp;

/// A freshly issued admission token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Seconds until the current code window expires
    pub expires_in: u64,
    pub party_id: u64,
    /// External QR image for the token payload
    pub qr_url: String,
    pub token: String,
}

/// Issue a fresh admission token for a party.
///
/// The party's secret is created and persisted on first request and never
/// rotated afterwards, so every subsequent token verifies against the same
/// secret.
pub fn issue_token(waitlist: &Waitlist, party_id: u64) -> Result<IssuedToken, QueueError> {
    let secret = waitlist.totp_secret(party_id)?;
    let code = totp::current_code(&secret)?;
    let token = format!("{party_id}:{code}");
    let qr_url = format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data={token}"
    );

    Ok(IssuedToken {
        expires_in: totp::time_remaining(),
        party_id,
        qr_url,
        token,
    })
}

/// Verify a scanned token. Returns the party on success without mutating
/// any state; the caller decides whether to confirm arrival. All
/// rejections collapse to `Ok(None)`.
///
/// Only CALLED parties are admitted: a WAITING party scanning early or an
/// ARRIVED party scanning again is rejected.
pub fn verify_token(waitlist: &Waitlist, token: &str) -> Result<Option<QueuedParty>, QueueError> {
    let Some((party_id, code)) = parse_token(token) else {
        tracing::warn!("Rejected malformed admission token");
        return Ok(None);
    };

    let party = match waitlist.party(party_id) {
        Ok(party) => party,
        Err(QueueError::PartyNotFound(_)) => {
            tracing::warn!(party_id, "Admission token for unknown party");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let Some(secret) = party.totp_secret.as_deref() else {
        tracing::warn!(party_id, "Admission token for party without a secret");
        return Ok(None);
    };

    let valid = match totp::verify_code(secret, code) {
        Ok(valid) => valid,
        Err(e) => {
            // A stored secret that fails to decode is corruption; the scan
            // gate still answers with a plain rejection.
            tracing::error!(party_id, error = %e, "Stored admission secret unreadable");
            false
        }
    };
    if !valid {
        tracing::warn!(party_id, "Admission code verification failed");
        return Ok(None);
    }

    if party.status != PartyStatus::Called {
        tracing::warn!(party_id, status = ?party.status, "Admission refused: party not called");
        return Ok(None);
    }

    Ok(Some(party))
}

/// Parse the `<party-id>:<code>` wire format. Both halves must be plain
/// ASCII decimal; anything else is malformed.
fn parse_token(token: &str) -> Option<(u64, &str)> {
    let (id, code) = token.split_once(':')?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if code.len() != totp::CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((id.parse().ok()?, code))
}
