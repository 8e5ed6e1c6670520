//! End-to-end integration tests

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use waitlist_manager::admission;
use waitlist_manager::config::{QueueConfig, SeatingConfig};
use waitlist_manager::notify::{Notification, Notifier};
use waitlist_manager::queue::{QueueError, Waitlist};
use waitlist_manager::seating::SeatingRegistry;
use waitlist_manager::storage::models::{PartyStatus, TableStatus};
use waitlist_manager::storage::Database;

fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

fn setup_waitlist(db: Database) -> (Waitlist, UnboundedReceiver<Notification>) {
    let (notifier, rx) = Notifier::channel();
    let waitlist = Waitlist::restore(db, notifier, QueueConfig::default()).unwrap();
    (waitlist, rx)
}

#[test]
fn test_two_party_admission_scenario() {
    let (db, _temp) = setup_db();
    let (waitlist, _rx) = setup_waitlist(db);

    // Party A joins with two people: first ticket, front of the queue
    let a = waitlist.join(101, 2).unwrap();
    assert_eq!(a.ticket_number, 1);
    assert_eq!(waitlist.rank(a.id), Some(0));

    // Party B joins behind A
    let b = waitlist.join(102, 4).unwrap();
    assert_eq!(b.ticket_number, 2);
    assert_eq!(waitlist.rank(b.id), Some(1));

    // The operator calls A: A leaves the rank index, B moves up
    let called = waitlist.call(a.id).unwrap();
    assert_eq!(called.status, PartyStatus::Called);
    assert_eq!(waitlist.rank(a.id), None);
    assert_eq!(waitlist.rank(b.id), Some(0));

    // A requests an admission token
    let issued = admission::issue_token(&waitlist, a.id).unwrap();
    assert!(issued.token.starts_with(&format!("{}:", a.id)));
    let code = issued.token.split_once(':').unwrap().1;
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|c| c.is_ascii_digit()));

    // Scanning the token at the entrance admits A
    let admitted = admission::verify_token(&waitlist, &issued.token)
        .unwrap()
        .expect("token should verify");
    assert_eq!(admitted.id, a.id);

    // The same code presented under B's id is rejected
    let forged = format!("{}:{code}", b.id);
    assert!(admission::verify_token(&waitlist, &forged)
        .unwrap()
        .is_none());

    // The operator confirms arrival; a replay of the token now fails
    // because A is no longer CALLED
    waitlist.confirm_arrival(a.id).unwrap();
    assert!(admission::verify_token(&waitlist, &issued.token)
        .unwrap()
        .is_none());
}

#[test]
fn test_cancel_updates_everyone_immediately() {
    let (db, _temp) = setup_db();
    let (waitlist, _rx) = setup_waitlist(db);

    let a = waitlist.join(1, 2).unwrap();
    let b = waitlist.join(2, 2).unwrap();
    let c = waitlist.join(3, 2).unwrap();
    let d = waitlist.join(4, 2).unwrap();

    // Cancel from the middle of the queue
    waitlist.cancel(b.id).unwrap();

    assert_eq!(waitlist.rank(a.id), Some(0));
    assert_eq!(waitlist.rank(c.id), Some(1));
    assert_eq!(waitlist.rank(d.id), Some(2));
    assert_eq!(waitlist.stats().waiting, 3);
}

#[test]
fn test_full_seating_flow() {
    let (db, _temp) = setup_db();
    let (waitlist, _rx) = setup_waitlist(db.clone());
    let seating = SeatingRegistry::restore_or_seed(db, &SeatingConfig::default()).unwrap();

    let party = waitlist.join(7, 4).unwrap();

    // Seating a party that has not been called fails
    assert!(matches!(
        waitlist.assign_table(party.id, 1, &seating),
        Err(QueueError::Conflict(_))
    ));

    waitlist.call(party.id).unwrap();
    let seated = waitlist.assign_table(party.id, 1, &seating).unwrap();
    assert_eq!(seated.status, PartyStatus::Arrived);

    let table = seating.get(1).unwrap();
    assert_eq!(table.status, TableStatus::Occupied);
    assert_eq!(table.current_party, Some(party.id));

    // The table cannot be double-booked
    let other = waitlist.join(8, 2).unwrap();
    waitlist.call(other.id).unwrap();
    assert!(matches!(
        waitlist.assign_table(other.id, 1, &seating),
        Err(QueueError::Conflict(_))
    ));

    // Bus and reopen the table, then seat the next party
    seating.update_status(1, TableStatus::Cleaning).unwrap();
    seating.update_status(1, TableStatus::Empty).unwrap();
    waitlist.assign_table(other.id, 1, &seating).unwrap();

    // The first guest is free to queue again
    waitlist.join(7, 2).unwrap();
}

#[test]
fn test_state_survives_restart() {
    let (db, _temp) = setup_db();

    let (a_id, b_id, token) = {
        let (waitlist, _rx) = setup_waitlist(db.clone());
        let a = waitlist.join(1, 2).unwrap();
        let b = waitlist.join(2, 2).unwrap();
        waitlist.call(a.id).unwrap();
        let issued = admission::issue_token(&waitlist, a.id).unwrap();
        (a.id, b.id, issued.token)
    };

    // "Restart": rebuild everything from the store
    let (waitlist, _rx) = setup_waitlist(db);

    // The CALLED party still verifies with the token issued before the
    // restart (same persisted secret, same window)
    let admitted = admission::verify_token(&waitlist, &token)
        .unwrap()
        .expect("token should verify after restart");
    assert_eq!(admitted.id, a_id);

    // The WAITING party kept its place
    assert_eq!(waitlist.rank(b_id), Some(0));
}

#[test]
fn test_no_show_expiry_frees_the_guest() {
    let (db, _temp) = setup_db();
    let (waitlist, _rx) = setup_waitlist(db);

    let party = waitlist.join(5, 2).unwrap();
    waitlist.call(party.id).unwrap();

    // The guest cannot rejoin while CALLED
    assert!(matches!(waitlist.join(5, 2), Err(QueueError::Conflict(_))));

    std::thread::sleep(std::time::Duration::from_millis(5));
    let expired = waitlist.expire_overdue_calls(chrono::Duration::milliseconds(1));
    assert_eq!(expired, 1);
    assert_eq!(
        waitlist.party(party.id).unwrap().status,
        PartyStatus::Canceled
    );

    // And may rejoin afterwards
    waitlist.join(5, 2).unwrap();
}

#[test]
fn test_purge_keeps_identities_unique() {
    let (db, _temp) = setup_db();
    let (waitlist, _rx) = setup_waitlist(db);

    let a = waitlist.join(1, 2).unwrap();
    waitlist.join(2, 2).unwrap();

    assert_eq!(waitlist.purge().unwrap(), 2);
    assert_eq!(waitlist.stats().waiting, 0);

    // Sequences are not reset: new parties never reuse purged identities
    let fresh = waitlist.join(1, 2).unwrap();
    assert!(fresh.id > a.id);
    assert!(fresh.ticket_number > a.ticket_number);
}
