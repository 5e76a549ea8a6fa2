//! Defines the store for the append-only audit history.

use crate::{
    Error,
    models::{AuditEntry, DatabaseID, NewAuditEntry},
};

/// Handles appending and reading audit entries.
///
/// There is deliberately no update or delete: history only grows.
pub trait AuditStore {
    /// Append an entry to the audit history.
    fn append(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, Error>;

    /// Retrieve the audit history for a transaction, oldest first.
    fn for_transaction(&self, transaction_id: DatabaseID) -> Result<Vec<AuditEntry>, Error>;

    /// Retrieve the most recent `limit` entries, newest first.
    fn recent(&self, limit: u64) -> Result<Vec<AuditEntry>, Error>;
}
