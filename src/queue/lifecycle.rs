//! The waiting lifecycle: sole writer of party state transitions.
//!
//! Every mutating operation on a single party is serialized by that party's
//! own mutex. Transitions validate under the lock, persist the updated
//! record first, and only then commit to memory and the rank index, so a
//! storage failure surfaces to the caller and leaves nothing half-applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::QueueConfig;
use crate::notify::{Notifier, QueueEvent};
use crate::seating::SeatingRegistry;
use crate::storage::models::{PartyStatus, QueuedParty};
use crate::storage::Database;

use super::rank_index::WaitingQueue;
use super::QueueError;

/// A party's externally visible position in the queue.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueuePosition {
    pub estimated_minutes: u64,
    pub rank: u64,
}

/// Operator dashboard counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WaitlistStats {
    pub arrived_today: u64,
    pub called: u64,
    pub waiting: u64,
}

pub struct Waitlist {
    /// guest_id -> party_id for parties in WAITING or CALLED state.
    /// Guarded by its own lock, which also serializes joins.
    active: Mutex<HashMap<u64, u64>>,
    config: QueueConfig,
    db: Database,
    next_party_id: AtomicU64,
    next_ticket: AtomicU64,
    notifier: Notifier,
    parties: RwLock<HashMap<u64, Arc<Mutex<QueuedParty>>>>,
    queue: WaitingQueue,
}

impl Waitlist {
    /// Rebuild the live queue from the store.
    ///
    /// Id and ticket sequences resume at max + 1, so identities are never
    /// reused across restarts.
    pub fn restore(
        db: Database,
        notifier: Notifier,
        config: QueueConfig,
    ) -> Result<Self, QueueError> {
        let records = db.load_all_parties()?;

        let queue = WaitingQueue::new();
        let mut parties = HashMap::with_capacity(records.len());
        let mut active = HashMap::new();
        let mut max_id = 0u64;
        let mut max_ticket = 0u64;

        for party in records {
            max_id = max_id.max(party.id);
            max_ticket = max_ticket.max(party.ticket_number);
            if party.status == PartyStatus::Waiting {
                queue.insert(party.id, party.ticket_number);
            }
            if party.status.is_active() {
                active.insert(party.guest_id, party.id);
            }
            parties.insert(party.id, Arc::new(Mutex::new(party)));
        }

        tracing::info!(
            parties = parties.len(),
            waiting = queue.len(),
            "Restored waitlist from store"
        );

        Ok(Self {
            active: Mutex::new(active),
            config,
            db,
            next_party_id: AtomicU64::new(max_id + 1),
            next_ticket: AtomicU64::new(max_ticket + 1),
            notifier,
            parties: RwLock::new(parties),
            queue,
        })
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Join the queue. At most one active (WAITING or CALLED) party per
    /// guest; violations fail Conflict.
    pub fn join(&self, guest_id: u64, head_count: u32) -> Result<QueuedParty, QueueError> {
        if head_count == 0 {
            return Err(QueueError::conflict("head_count must be at least 1"));
        }

        // The active-guest lock is held across allocation and indexing, so
        // ticket order and queue insertion order can never disagree.
        let mut active = self.active.lock().expect("active index lock poisoned");
        if active.contains_key(&guest_id) {
            return Err(QueueError::conflict(format!(
                "guest {guest_id} already has an active party"
            )));
        }

        let party = QueuedParty {
            called_at: None,
            guest_id,
            head_count,
            id: self.next_party_id.fetch_add(1, Ordering::SeqCst),
            joined_at: Utc::now(),
            status: PartyStatus::Waiting,
            ticket_number: self.next_ticket.fetch_add(1, Ordering::SeqCst),
            totp_secret: None,
        };

        self.db.save_party(&party)?;

        self.parties
            .write()
            .expect("party map lock poisoned")
            .insert(party.id, Arc::new(Mutex::new(party.clone())));
        self.queue.insert(party.id, party.ticket_number);
        active.insert(guest_id, party.id);

        tracing::info!(
            party_id = party.id,
            ticket = party.ticket_number,
            head_count,
            "Party joined the waitlist"
        );
        Ok(party)
    }

    /// Call a WAITING party to the entrance. De-indexes it and notifies it.
    pub fn call(&self, party_id: u64) -> Result<QueuedParty, QueueError> {
        let handle = self.party_handle(party_id)?;
        let mut party = handle.lock().expect("party lock poisoned");

        if party.status != PartyStatus::Waiting {
            return Err(QueueError::conflict("only a waiting party can be called"));
        }

        let called_at = Utc::now();
        let mut updated = party.clone();
        updated.call(called_at);

        self.db.save_party(&updated)?;
        *party = updated.clone();
        self.queue.remove(party_id);
        drop(party);

        self.notifier.notify(party_id, QueueEvent::Called { called_at });
        tracing::info!(party_id, "Party called");
        Ok(updated)
    }

    /// Confirm that a CALLED party arrived at the entrance.
    pub fn confirm_arrival(&self, party_id: u64) -> Result<QueuedParty, QueueError> {
        let handle = self.party_handle(party_id)?;
        let mut party = handle.lock().expect("party lock poisoned");

        if party.status != PartyStatus::Called {
            return Err(QueueError::conflict(
                "only a called party can confirm arrival",
            ));
        }

        let mut updated = party.clone();
        updated.arrive();

        self.db.save_party(&updated)?;
        *party = updated.clone();
        drop(party);

        self.release_guest(updated.guest_id, party_id);
        tracing::info!(party_id, "Party arrived");
        Ok(updated)
    }

    /// Cancel a WAITING or CALLED party. Arrived and already-canceled
    /// parties fail Conflict.
    pub fn cancel(&self, party_id: u64) -> Result<QueuedParty, QueueError> {
        let handle = self.party_handle(party_id)?;
        let mut party = handle.lock().expect("party lock poisoned");

        match party.status {
            PartyStatus::Waiting | PartyStatus::Called => {}
            PartyStatus::Canceled => {
                return Err(QueueError::conflict("party is already canceled"));
            }
            PartyStatus::Arrived => {
                return Err(QueueError::conflict("an arrived party cannot be canceled"));
            }
        }

        let was_waiting = party.status == PartyStatus::Waiting;
        let mut updated = party.clone();
        updated.cancel();

        self.db.save_party(&updated)?;
        *party = updated.clone();
        if was_waiting {
            self.queue.remove(party_id);
        }
        drop(party);

        self.release_guest(updated.guest_id, party_id);
        self.notifier.notify(party_id, QueueEvent::Canceled);
        tracing::info!(party_id, was_waiting, "Party canceled");
        Ok(updated)
    }

    /// Seat a CALLED or ARRIVED party at a table. The table must be EMPTY;
    /// the party transitions to ARRIVED if it has not already.
    ///
    /// Ordering across the two records: the table is occupied first, then
    /// the party is persisted. A party-save failure surfaces for retry with
    /// the table already held.
    pub fn assign_table(
        &self,
        party_id: u64,
        table_id: u64,
        seating: &SeatingRegistry,
    ) -> Result<QueuedParty, QueueError> {
        let handle = self.party_handle(party_id)?;
        let mut party = handle.lock().expect("party lock poisoned");

        if !matches!(party.status, PartyStatus::Called | PartyStatus::Arrived) {
            return Err(QueueError::conflict(
                "only a called or arrived party can be seated",
            ));
        }

        seating.occupy(table_id, party_id)?;

        if party.status == PartyStatus::Arrived {
            tracing::info!(party_id, table_id, "Party seated");
            return Ok(party.clone());
        }

        let mut updated = party.clone();
        updated.arrive();

        self.db.save_party(&updated)?;
        *party = updated.clone();
        drop(party);

        self.release_guest(updated.guest_id, party_id);
        tracing::info!(party_id, table_id, "Party seated");
        Ok(updated)
    }

    /// Return the party's TOTP secret, creating and persisting one on
    /// first use. Once set, the secret never changes.
    pub fn totp_secret(&self, party_id: u64) -> Result<String, QueueError> {
        let handle = self.party_handle(party_id)?;
        let mut party = handle.lock().expect("party lock poisoned");

        if let Some(secret) = &party.totp_secret {
            return Ok(secret.clone());
        }

        let secret = crate::totp::generate_secret();
        let mut updated = party.clone();
        updated.totp_secret = Some(secret.clone());

        self.db.save_party(&updated)?;
        *party = updated;

        tracing::debug!(party_id, "Created admission secret");
        Ok(secret)
    }

    /// Cancel CALLED parties whose call window has lapsed (no-shows).
    /// Returns how many were canceled.
    pub fn expire_overdue_calls(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let overdue = self.collect_overdue(cutoff);

        let mut expired = 0;
        for party_id in overdue {
            match self.cancel(party_id) {
                Ok(_) => {
                    tracing::info!(party_id, "Canceled no-show party");
                    expired += 1;
                }
                // The state moved on between the scan and the cancel
                Err(QueueError::Conflict(_)) => {}
                Err(e) => {
                    tracing::error!(party_id, error = %e, "Failed to cancel no-show party")
                }
            }
        }
        expired
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Snapshot of a party.
    pub fn party(&self, party_id: u64) -> Result<QueuedParty, QueueError> {
        let handle = self.party_handle(party_id)?;
        let party = handle.lock().expect("party lock poisoned");
        Ok(party.clone())
    }

    /// The guest's active (WAITING or CALLED) party, if any.
    pub fn active_party_for_guest(&self, guest_id: u64) -> Option<QueuedParty> {
        let party_id = {
            let active = self.active.lock().expect("active index lock poisoned");
            *active.get(&guest_id)?
        };
        self.party(party_id).ok()
    }

    /// Number of parties strictly ahead, or None if not WAITING.
    pub fn rank(&self, party_id: u64) -> Option<usize> {
        self.queue.rank(party_id)
    }

    /// Rank plus the linear wait estimate. The estimate deliberately
    /// ignores party size and table capacity; it is rank times a fixed
    /// per-party service time.
    pub fn position(&self, party_id: u64) -> Option<QueuePosition> {
        let rank = self.queue.rank(party_id)? as u64;
        Some(QueuePosition {
            estimated_minutes: rank * self.config.per_party_service_minutes,
            rank,
        })
    }

    /// Push the party's current position to its client, if it is WAITING.
    pub fn push_rank_update(&self, party_id: u64) {
        if let Some(position) = self.position(party_id) {
            self.notifier.notify(
                party_id,
                QueueEvent::RankChanged {
                    estimated_minutes: position.estimated_minutes,
                    rank: position.rank,
                },
            );
        }
    }

    /// All parties, optionally filtered by status, in ticket order.
    pub fn list(&self, status: Option<PartyStatus>) -> Vec<QueuedParty> {
        let parties = self.parties.read().expect("party map lock poisoned");
        let mut result: Vec<QueuedParty> = parties
            .values()
            .map(|handle| handle.lock().expect("party lock poisoned").clone())
            .filter(|party| status.map(|s| party.status == s).unwrap_or(true))
            .collect();
        result.sort_by_key(|party| party.ticket_number);
        result
    }

    /// Dashboard counters.
    pub fn stats(&self) -> WaitlistStats {
        let today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc());

        let parties = self.parties.read().expect("party map lock poisoned");
        let mut called = 0u64;
        let mut arrived_today = 0u64;
        for handle in parties.values() {
            let party = handle.lock().expect("party lock poisoned");
            match party.status {
                PartyStatus::Called => called += 1,
                PartyStatus::Arrived => {
                    if today.map(|t| party.joined_at >= t).unwrap_or(false) {
                        arrived_today += 1;
                    }
                }
                _ => {}
            }
        }

        WaitlistStats {
            arrived_today,
            called,
            waiting: self.queue.len() as u64,
        }
    }

    /// Drop all live queue state and purge party records. Test/reset paths
    /// only; sequences are not reset, so identities stay unique.
    pub fn purge(&self) -> Result<u64, QueueError> {
        let purged = self.db.purge_parties()?;
        self.parties
            .write()
            .expect("party map lock poisoned")
            .clear();
        self.active
            .lock()
            .expect("active index lock poisoned")
            .clear();
        self.queue.clear();
        tracing::warn!(purged, "Purged all party records");
        Ok(purged)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Clone the party's handle, dropping the map guard before returning so
    /// callers never hold the map lock while waiting on a party lock.
    fn party_handle(&self, party_id: u64) -> Result<Arc<Mutex<QueuedParty>>, QueueError> {
        self.parties
            .read()
            .expect("party map lock poisoned")
            .get(&party_id)
            .cloned()
            .ok_or(QueueError::PartyNotFound(party_id))
    }

    /// Remove the guest's active-index entry if it still points at this
    /// party.
    fn release_guest(&self, guest_id: u64, party_id: u64) {
        let mut active = self.active.lock().expect("active index lock poisoned");
        if active.get(&guest_id) == Some(&party_id) {
            active.remove(&guest_id);
        }
    }

    fn collect_overdue(&self, cutoff: DateTime<Utc>) -> Vec<u64> {
        let parties = self.parties.read().expect("party map lock poisoned");
        parties
            .values()
            .filter_map(|handle| {
                let party = handle.lock().expect("party lock poisoned");
                party.is_overdue_at(cutoff).then_some(party.id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;
    use crate::testutil::{setup_db, test_waitlist};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_join_assigns_increasing_tickets() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 4).unwrap();
        let c = waitlist.join(3, 1).unwrap();

        assert_eq!(a.ticket_number, 1);
        assert_eq!(b.ticket_number, 2);
        assert_eq!(c.ticket_number, 3);
        assert_eq!(waitlist.rank(a.id), Some(0));
        assert_eq!(waitlist.rank(b.id), Some(1));
        assert_eq!(waitlist.rank(c.id), Some(2));
    }

    #[test]
    fn test_join_rejects_second_active_party() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        assert!(matches!(
            waitlist.join(1, 3),
            Err(QueueError::Conflict(_))
        ));

        // Still blocked while CALLED
        waitlist.call(a.id).unwrap();
        assert!(matches!(
            waitlist.join(1, 3),
            Err(QueueError::Conflict(_))
        ));

        // Free again after arrival
        waitlist.confirm_arrival(a.id).unwrap();
        waitlist.join(1, 3).unwrap();
    }

    #[test]
    fn test_join_rejects_empty_party() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);
        assert!(matches!(
            waitlist.join(1, 0),
            Err(QueueError::Conflict(_))
        ));
    }

    #[test]
    fn test_call_removes_from_rank_index_and_notifies() {
        let (db, _temp) = setup_db();
        let (waitlist, mut rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 2).unwrap();
        drain(&mut rx);

        let called = waitlist.call(a.id).unwrap();
        assert_eq!(called.status, PartyStatus::Called);
        assert!(called.called_at.is_some());
        assert_eq!(waitlist.rank(a.id), None);
        assert_eq!(waitlist.rank(b.id), Some(0));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].party_id, a.id);
        assert!(matches!(events[0].event, QueueEvent::Called { .. }));
    }

    #[test]
    fn test_illegal_transitions_fail_conflict() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();

        // Arrival before call
        assert!(matches!(
            waitlist.confirm_arrival(a.id),
            Err(QueueError::Conflict(_))
        ));

        waitlist.call(a.id).unwrap();

        // Double call
        assert!(matches!(waitlist.call(a.id), Err(QueueError::Conflict(_))));

        waitlist.confirm_arrival(a.id).unwrap();

        // Cancel after arrival
        assert!(matches!(
            waitlist.cancel(a.id),
            Err(QueueError::Conflict(_))
        ));
    }

    #[test]
    fn test_unknown_party_fails_not_found() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        assert!(matches!(
            waitlist.call(99),
            Err(QueueError::PartyNotFound(99))
        ));
        assert!(matches!(
            waitlist.party(99),
            Err(QueueError::PartyNotFound(99))
        ));
    }

    #[test]
    fn test_cancel_waiting_party_updates_ranks_immediately() {
        let (db, _temp) = setup_db();
        let (waitlist, mut rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 2).unwrap();
        let c = waitlist.join(3, 2).unwrap();
        drain(&mut rx);

        waitlist.cancel(b.id).unwrap();

        assert_eq!(waitlist.rank(a.id), Some(0));
        assert_eq!(waitlist.rank(b.id), None);
        assert_eq!(waitlist.rank(c.id), Some(1));

        // Guest 2 may rejoin at the back of the queue
        let rejoined = waitlist.join(2, 2).unwrap();
        assert_eq!(rejoined.ticket_number, 4);
        assert_eq!(waitlist.rank(rejoined.id), Some(2));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|n| n.party_id == b.id && matches!(n.event, QueueEvent::Canceled)));
    }

    #[test]
    fn test_double_cancel_fails_conflict() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        waitlist.cancel(a.id).unwrap();
        assert!(matches!(
            waitlist.cancel(a.id),
            Err(QueueError::Conflict(_))
        ));
    }

    #[test]
    fn test_totp_secret_is_created_once() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db.clone());

        let a = waitlist.join(1, 2).unwrap();
        let first = waitlist.totp_secret(a.id).unwrap();
        let second = waitlist.totp_secret(a.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);

        // Persisted with the party
        let stored = db.load_party(a.id).unwrap().unwrap();
        assert_eq!(stored.totp_secret.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_expire_overdue_calls_cancels_no_shows_only() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let first_called = waitlist.join(1, 2).unwrap();
        let second_called = waitlist.join(2, 2).unwrap();
        let waiting = waitlist.join(3, 2).unwrap();

        waitlist.call(first_called.id).unwrap();
        waitlist.call(second_called.id).unwrap();

        // Near-zero window: both calls predate "now"
        std::thread::sleep(std::time::Duration::from_millis(5));
        let expired = waitlist.expire_overdue_calls(Duration::milliseconds(2));
        assert_eq!(expired, 2);
        assert_eq!(
            waitlist.party(first_called.id).unwrap().status,
            PartyStatus::Canceled
        );

        // A generous window expires nobody else
        let expired = waitlist.expire_overdue_calls(Duration::hours(1));
        assert_eq!(expired, 0);
        assert_eq!(
            waitlist.party(waiting.id).unwrap().status,
            PartyStatus::Waiting
        );
    }

    #[test]
    fn test_restore_rebuilds_queue_and_sequences() {
        let (db, _temp) = setup_db();

        let (a_id, c_id) = {
            let (waitlist, _rx) = test_waitlist(db.clone());
            let a = waitlist.join(1, 2).unwrap();
            let b = waitlist.join(2, 2).unwrap();
            let c = waitlist.join(3, 2).unwrap();
            waitlist.call(a.id).unwrap();
            waitlist.cancel(b.id).unwrap();
            (a.id, c.id)
        };

        let (restored, _rx) = test_waitlist(db);

        // Only the WAITING party is indexed
        assert_eq!(restored.rank(c_id), Some(0));
        assert_eq!(restored.rank(a_id), None);

        // The called party's guest is still active, the canceled one is not
        assert!(matches!(
            restored.join(1, 2),
            Err(QueueError::Conflict(_))
        ));
        restored.join(2, 2).unwrap();

        // Sequences resume past the persisted maximum
        let next = restored.join(9, 2).unwrap();
        assert_eq!(next.ticket_number, 5);
    }

    #[test]
    fn test_list_is_in_ticket_order() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 2).unwrap();
        let c = waitlist.join(3, 2).unwrap();
        waitlist.call(b.id).unwrap();

        let all = waitlist.list(None);
        assert_eq!(
            all.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![a.id, b.id, c.id]
        );

        let waiting = waitlist.list(Some(PartyStatus::Waiting));
        assert_eq!(
            waiting.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![a.id, c.id]
        );
    }

    #[test]
    fn test_stats_counts() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        let a = waitlist.join(1, 2).unwrap();
        waitlist.join(2, 2).unwrap();
        waitlist.join(3, 2).unwrap();
        waitlist.call(a.id).unwrap();
        waitlist.confirm_arrival(a.id).unwrap();

        let stats = waitlist.stats();
        assert_eq!(stats.waiting, 2);
        assert_eq!(stats.called, 0);
        assert_eq!(stats.arrived_today, 1);
    }

    #[test]
    fn test_position_uses_linear_estimate() {
        let (db, _temp) = setup_db();
        let (waitlist, _rx) = test_waitlist(db);

        waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 2).unwrap();

        let position = waitlist.position(b.id).unwrap();
        assert_eq!(position.rank, 1);
        // testutil config: 10 minutes per party ahead
        assert_eq!(position.estimated_minutes, 10);
    }
}
