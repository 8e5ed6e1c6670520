//! waitlist-manager - waiting-queue coordination with TOTP-gated admission
//!
//! This crate coordinates a single physical queue of waiting parties
//! competing for a small set of dining tables, with:
//! - Strictly increasing ticket numbers and live "parties ahead of me"
//!   rank queries
//! - A WAITING -> CALLED -> ARRIVED / CANCELED lifecycle with per-party
//!   serialization
//! - RFC 6238 one-time admission codes (QR payloads) with clock-skew
//!   tolerance, verified at the entrance
//! - Automatic no-show cancellation via a background task
//! - redb embedded persistence (crash-safe, rebuilt into memory at startup)
//! - REST API

pub mod admission;
pub mod api;
pub mod config;
pub mod expiration;
pub mod notify;
pub mod queue;
pub mod seating;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod totp;

use config::Config;
use queue::Waitlist;
use seating::SeatingRegistry;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub seating: SeatingRegistry,
    pub waitlist: Waitlist,
}
