//! The seating resource collaborator: dining tables and their occupancy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::config::SeatingConfig;
use crate::queue::QueueError;
use crate::storage::models::{DiningTable, TableStatus};
use crate::storage::Database;

/// Registry of the venue's dining tables. Same locking discipline as the
/// waitlist: a map of per-record mutexes, persist-then-commit on writes.
pub struct SeatingRegistry {
    db: Database,
    tables: RwLock<HashMap<u64, Arc<Mutex<DiningTable>>>>,
}

impl SeatingRegistry {
    /// Load tables from the store, or seed the venue layout on first run:
    /// tables 1-8 seat 4, tables 9-10 seat 6 by default.
    pub fn restore_or_seed(db: Database, layout: &SeatingConfig) -> Result<Self, QueueError> {
        let mut records = db.load_all_tables()?;

        if records.is_empty() {
            let total = layout.four_tops + layout.six_tops;
            for number in 1..=total {
                let capacity = if number <= layout.four_tops { 4 } else { 6 };
                let table = DiningTable {
                    capacity,
                    current_party: None,
                    id: u64::from(number),
                    status: TableStatus::Empty,
                    table_number: number,
                };
                db.save_table(&table)?;
                records.push(table);
            }
            tracing::info!(count = records.len(), "Seeded venue seating layout");
        } else {
            tracing::info!(count = records.len(), "Restored seating from store");
        }

        let tables = records
            .into_iter()
            .map(|table| (table.id, Arc::new(Mutex::new(table))))
            .collect();

        Ok(Self {
            db,
            tables: RwLock::new(tables),
        })
    }

    /// All tables in table-number order.
    pub fn list(&self) -> Vec<DiningTable> {
        let tables = self.tables.read().expect("table map lock poisoned");
        let mut result: Vec<DiningTable> = tables
            .values()
            .map(|handle| handle.lock().expect("table lock poisoned").clone())
            .collect();
        result.sort_by_key(|table| table.table_number);
        result
    }

    /// Snapshot of one table.
    pub fn get(&self, table_id: u64) -> Result<DiningTable, QueueError> {
        let handle = self.table_handle(table_id)?;
        let table = handle.lock().expect("table lock poisoned");
        Ok(table.clone())
    }

    /// Seat a party at an EMPTY table. Any other status fails Conflict.
    pub fn occupy(&self, table_id: u64, party_id: u64) -> Result<DiningTable, QueueError> {
        let handle = self.table_handle(table_id)?;
        let mut table = handle.lock().expect("table lock poisoned");

        if table.status != TableStatus::Empty {
            return Err(QueueError::conflict(format!(
                "table {} is not available",
                table.table_number
            )));
        }

        let mut updated = table.clone();
        updated.occupy(party_id);

        self.db.save_table(&updated)?;
        *table = updated.clone();

        tracing::info!(table_id, party_id, "Table occupied");
        Ok(updated)
    }

    /// Operator status change (bus the table, reopen it). Leaving OCCUPIED
    /// releases the seated party reference.
    pub fn update_status(
        &self,
        table_id: u64,
        status: TableStatus,
    ) -> Result<DiningTable, QueueError> {
        let handle = self.table_handle(table_id)?;
        let mut table = handle.lock().expect("table lock poisoned");

        let mut updated = table.clone();
        updated.status = status;
        if status != TableStatus::Occupied {
            updated.current_party = None;
        }

        self.db.save_table(&updated)?;
        *table = updated.clone();

        tracing::info!(table_id, ?status, "Table status updated");
        Ok(updated)
    }

    /// (occupied, total) table counts for the dashboard.
    pub fn occupancy(&self) -> (u64, u64) {
        let tables = self.tables.read().expect("table map lock poisoned");
        let total = tables.len() as u64;
        let occupied = tables
            .values()
            .filter(|handle| {
                handle.lock().expect("table lock poisoned").status == TableStatus::Occupied
            })
            .count() as u64;
        (occupied, total)
    }

    fn table_handle(&self, table_id: u64) -> Result<Arc<Mutex<DiningTable>>, QueueError> {
        self.tables
            .read()
            .expect("table map lock poisoned")
            .get(&table_id)
            .cloned()
            .ok_or(QueueError::TableNotFound(table_id))
    }
}
