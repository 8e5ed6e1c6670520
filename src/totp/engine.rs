//! RFC 6238 time-based one-time passwords over an RFC 4226 HMAC-SHA1 core.
//!
//! Codes are always exactly 6 ASCII digits with leading zeros preserved.
//! Verification tolerates one step of clock skew in either direction, i.e.
//! exactly the three steps {current-1, current, current+1}.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::base32;

/// Codes are 6 decimal digits
pub const CODE_DIGITS: usize = 6;
/// Secrets carry 20 bytes of entropy (32 Base32 characters)
pub const SECRET_BYTES: usize = 20;
/// Codes rotate every 30 seconds
pub const STEP_SECONDS: u64 = 30;

const CODE_MODULUS: u32 = 1_000_000;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Error)]
pub enum TotpError {
    #[error("secret is not valid base32: {0}")]
    InvalidSecret(#[from] base32::DecodeError),
}

/// Generate a fresh secret: 20 random bytes, Base32-encoded without padding.
pub fn generate_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; SECRET_BYTES] = rng.gen();
    base32::encode(&bytes)
}

/// Compute the 6-digit code for a secret at a given time step.
///
/// HMAC-SHA1 of the 8-byte big-endian step under the decoded secret,
/// dynamically truncated per RFC 4226: the low nibble of the last hash
/// byte selects a 4-byte slice, whose top bit is masked before reduction
/// modulo 10^6.
pub fn compute_code(secret: &str, time_step: u64) -> Result<String, TotpError> {
    let key = base32::decode(secret)?;

    // HMAC-SHA1 accepts keys of any length
    let mut mac = HmacSha1::new_from_slice(&key).expect("HMAC key of any length");
    mac.update(&time_step.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = usize::from(hash[hash.len() - 1] & 0x0f);
    let mut slice = [0u8; 4];
    slice.copy_from_slice(&hash[offset..offset + 4]);
    let binary = u32::from_be_bytes(slice) & 0x7fff_ffff;

    Ok(format!("{:06}", binary % CODE_MODULUS))
}

/// Compute the code for the current 30-second window.
pub fn current_code(secret: &str) -> Result<String, TotpError> {
    compute_code(secret, now_unix() / STEP_SECONDS)
}

/// Verify a candidate code against the current window, tolerating one step
/// of clock skew in either direction.
pub fn verify_code(secret: &str, candidate: &str) -> Result<bool, TotpError> {
    verify_code_at(secret, candidate, now_unix())
}

/// Verification core with an explicit clock, for tests and skew analysis.
pub fn verify_code_at(secret: &str, candidate: &str, at_unix: u64) -> Result<bool, TotpError> {
    if candidate.len() != CODE_DIGITS || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let step = at_unix / STEP_SECONDS;
    let mut matched = false;
    for candidate_step in [step.saturating_sub(1), step, step.saturating_add(1)] {
        let expected = compute_code(secret, candidate_step)?;
        let equal: bool = expected.as_bytes().ct_eq(candidate.as_bytes()).into();
        matched |= equal;
    }

    Ok(matched)
}

/// Seconds until the current 30-second window expires.
pub fn time_remaining() -> u64 {
    STEP_SECONDS - (now_unix() % STEP_SECONDS)
}

fn now_unix() -> u64 {
    // Business clocks do not predate the epoch
    Utc::now().timestamp().max(0) as u64
}
