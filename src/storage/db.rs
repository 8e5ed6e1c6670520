use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::models::{DiningTable, QueuedParty};
use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
}

/// The persistence boundary. Writes are atomic per single record;
/// cross-record ordering is the caller's responsibility.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("waitlist-manager.redb");
        let db = RedbDatabase::create(db_path)?;

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PARTIES)?;
            let _ = write_txn.open_table(DINING_TABLES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // Party operations
    // ========================================================================

    /// Store a queued party (insert or overwrite)
    pub fn save_party(&self, party: &QueuedParty) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PARTIES)?;
            let data = bincode::serialize(party)?;
            table.insert(party.id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a queued party by id
    pub fn load_party(&self, party_id: u64) -> Result<Option<QueuedParty>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PARTIES)?;

        match table.get(party_id)? {
            Some(data) => {
                let party: QueuedParty = bincode::deserialize(data.value())?;
                Ok(Some(party))
            }
            None => Ok(None),
        }
    }

    /// Load every party record (startup restore, stats)
    pub fn load_all_parties(&self) -> Result<Vec<QueuedParty>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PARTIES)?;

        let mut parties = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let party: QueuedParty = bincode::deserialize(value.value())?;
            parties.push(party);
        }

        Ok(parties)
    }

    // ========================================================================
    // Dining table operations
    // ========================================================================

    /// Store a dining table (insert or overwrite)
    pub fn save_table(&self, dining_table: &DiningTable) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DINING_TABLES)?;
            let data = bincode::serialize(dining_table)?;
            table.insert(dining_table.id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a dining table by id
    pub fn load_table(&self, table_id: u64) -> Result<Option<DiningTable>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES)?;

        match table.get(table_id)? {
            Some(data) => {
                let dining_table: DiningTable = bincode::deserialize(data.value())?;
                Ok(Some(dining_table))
            }
            None => Ok(None),
        }
    }

    /// Load every dining table (startup restore, listing)
    pub fn load_all_tables(&self) -> Result<Vec<DiningTable>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES)?;

        let mut tables = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let dining_table: DiningTable = bincode::deserialize(value.value())?;
            tables.push(dining_table);
        }

        Ok(tables)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all party records - for testing only
    pub fn purge_parties(&self) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut purged = 0u64;
        {
            let table = write_txn.open_table(PARTIES)?;
            let keys: Vec<u64> = table
                .iter()?
                .map(|r| r.map(|(k, _)| k.value()))
                .collect::<Result<Vec<_>, _>>()?;
            drop(table);

            let mut table = write_txn.open_table(PARTIES)?;
            for key in keys {
                table.remove(key)?;
                purged += 1;
            }
        }
        write_txn.commit()?;
        Ok(purged)
    }
}
