//! Best-effort recording of ledger mutations.

use crate::{
    Error,
    models::{AuditEntry, DatabaseID, NewAuditEntry},
    stores::AuditStore,
};

/// Writes audit history for ledger mutations.
///
/// Auditing is off the critical path: the outbox worker calls [record](AuditRecorder::record)
/// after the mutation has already been reported successful, and a failed
/// write is logged and kept as a dead letter rather than surfaced to the
/// mutation's caller.
#[derive(Debug, Clone)]
pub struct AuditRecorder<S> {
    store: S,
}

impl<S: AuditStore> AuditRecorder<S> {
    /// Create a recorder over the given audit store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append `entry` to the audit history.
    ///
    /// # Errors
    /// Returns a persistence error if the append fails. Callers on the
    /// fire-and-forget path log the error instead of propagating it.
    pub fn record(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, Error> {
        self.store.append(entry).inspect_err(|error| {
            tracing::error!("could not append audit entry: {error}");
        })
    }

    /// The audit history for a transaction, oldest first.
    pub fn history_for_transaction(
        &self,
        transaction_id: DatabaseID,
    ) -> Result<Vec<AuditEntry>, Error> {
        self.store.for_transaction(transaction_id)
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: u64) -> Result<Vec<AuditEntry>, Error> {
        self.store.recent(limit)
    }
}
