pub mod sqlite_incident_ledger;
pub mod sqlite_message_cache;

pub use sqlite_incident_ledger::SqliteIncidentLedger;
pub use sqlite_message_cache::SqliteMessageCache;
