use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queued party.
///
/// Transitions are monotonic: WAITING -> CALLED -> ARRIVED, with CANCELED
/// reachable from WAITING and CALLED. Nothing ever re-enters WAITING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    Arrived,
    Called,
    Canceled,
    Waiting,
}

impl PartyStatus {
    /// Active parties block their guest from joining the queue again.
    pub fn is_active(self) -> bool {
        matches!(self, PartyStatus::Waiting | PartyStatus::Called)
    }
}

/// One waiting group in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedParty {
    /// Set exactly once, on the transition to CALLED
    pub called_at: Option<DateTime<Utc>>,
    /// The actor who joined (external user record; opaque here)
    pub guest_id: u64,
    /// Positive, immutable after creation
    pub head_count: u32,
    /// Stable identity, never reused
    pub id: u64,
    /// When the party joined the queue
    pub joined_at: DateTime<Utc>,
    pub status: PartyStatus,
    /// Unique, strictly increasing; defines queue order
    pub ticket_number: u64,
    /// Base32 TOTP secret, lazily created on first token request,
    /// immutable once set
    pub totp_secret: Option<String>,
}

impl QueuedParty {
    pub fn call(&mut self, at: DateTime<Utc>) {
        self.status = PartyStatus::Called;
        self.called_at = Some(at);
    }

    pub fn arrive(&mut self) {
        self.status = PartyStatus::Arrived;
    }

    pub fn cancel(&mut self) {
        self.status = PartyStatus::Canceled;
    }

    /// A CALLED party whose call predates `cutoff` is a no-show.
    pub fn is_overdue_at(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == PartyStatus::Called
            && self.called_at.map(|at| at < cutoff).unwrap_or(false)
    }
}

/// Occupancy state of a dining table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Cleaning,
    Empty,
    Occupied,
}

/// A shared seating resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub capacity: u32,
    /// The party currently seated, while OCCUPIED
    pub current_party: Option<u64>,
    pub id: u64,
    pub status: TableStatus,
    /// Human-facing table number, unique
    pub table_number: u32,
}

impl DiningTable {
    pub fn occupy(&mut self, party_id: u64) {
        self.current_party = Some(party_id);
        self.status = TableStatus::Occupied;
    }

    pub fn clear(&mut self) {
        self.current_party = None;
        self.status = TableStatus::Empty;
    }
}
