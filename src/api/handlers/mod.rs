mod admin;
mod admission;
mod seating;
mod waitlist;

pub use admin::{admin_purge, health, stats};
pub use admission::{issue_token, verify_token};
pub use seating::{list_tables, update_table_status};
pub use waitlist::{
    assign_table, call_party, cancel_party, confirm_arrival, get_guest_status, join_waitlist,
    list_waitlist,
};
