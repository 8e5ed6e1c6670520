use redb::TableDefinition;

/// Queued parties: party_id -> QueuedParty (bincode)
pub const PARTIES: TableDefinition<u64, &[u8]> = TableDefinition::new("parties");

/// Dining tables: table_id -> DiningTable (bincode)
pub const DINING_TABLES: TableDefinition<u64, &[u8]> = TableDefinition::new("dining_tables");
