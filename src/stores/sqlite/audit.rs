//! Implements a SQLite backed audit store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::MapRow,
    models::{AuditEntry, DatabaseID, NewAuditEntry},
    stores::AuditStore,
};

/// Stores audit entries in a SQLite database.
///
/// The audit table carries no foreign key to the transaction table so that
/// entries survive the deletion of the transaction they describe.
#[derive(Debug, Clone)]
pub struct SQLiteAuditStore {
    connection: Arc<Mutex<Connection>>,
}

const COLUMNS: &str =
    "id, transaction_id, action, before_snapshot, after_snapshot, actor_id, at, note";

impl SQLiteAuditStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl AuditStore for SQLiteAuditStore {
    /// Append an entry to the audit history.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn append(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, Error> {
        let connection = self.connection.lock().map_err(|_| Error::DatabaseLock)?;

        let entry = connection
            .prepare(&format!(
                "INSERT INTO audit_entry
                 (transaction_id, action, before_snapshot, after_snapshot, actor_id, at, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {COLUMNS}"
            ))?
            .query_row(
                (
                    entry.transaction_id,
                    entry.action.as_str(),
                    entry.before,
                    entry.after,
                    entry.actor_id.as_i64(),
                    entry.at,
                    entry.note,
                ),
                AuditEntry::map_row,
            )?;

        Ok(entry)
    }

    /// Retrieve the audit history for a transaction, oldest first.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn for_transaction(&self, transaction_id: DatabaseID) -> Result<Vec<AuditEntry>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare(&format!(
                "SELECT {COLUMNS} FROM audit_entry
                 WHERE transaction_id = :transaction_id
                 ORDER BY id ASC"
            ))?
            .query_map(
                &[(":transaction_id", &transaction_id)],
                AuditEntry::map_row,
            )?
            .map(|maybe_entry| maybe_entry.map_err(Error::SqlError))
            .collect()
    }

    /// Retrieve the most recent `limit` entries, newest first.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn recent(&self, limit: u64) -> Result<Vec<AuditEntry>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare(&format!(
                "SELECT {COLUMNS} FROM audit_entry ORDER BY id DESC LIMIT :limit"
            ))?
            .query_map(&[(":limit", &(limit as i64))], AuditEntry::map_row)?
            .map(|maybe_entry| maybe_entry.map_err(Error::SqlError))
            .collect()
    }
}

#[cfg(test)]
mod sqlite_audit_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        models::{AuditAction, NewAuditEntry, Transaction, TransactionType, UserID},
        stores::{AuditStore, sqlite::SQLiteAuditStore},
    };

    fn get_store() -> SQLiteAuditStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SQLiteAuditStore::new(Arc::new(Mutex::new(connection)))
    }

    fn sample_transaction(id: i64) -> Transaction {
        Transaction {
            id,
            user_id: UserID::new(1),
            account_id: 2,
            category_id: None,
            goal_id: None,
            kind: TransactionType::Expense,
            amount: 30.0,
            date: date!(2025 - 10 - 01),
            note: "Petrol".to_owned(),
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn append_and_read_history_for_transaction() {
        let mut store = get_store();
        let transaction = sample_transaction(7);
        store
            .append(NewAuditEntry::created(&transaction))
            .expect("Could not append created entry");
        store
            .append(NewAuditEntry::deleted(&transaction))
            .expect("Could not append deleted entry");

        let history = store.for_transaction(7).expect("Could not read history");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Created);
        assert_eq!(history[1].action, AuditAction::Deleted);
        assert!(history[0].after.is_some());
        assert!(history[1].before.is_some());
    }

    #[test]
    fn recent_returns_newest_first_up_to_limit() {
        let mut store = get_store();
        for id in 1..=3 {
            store
                .append(NewAuditEntry::created(&sample_transaction(id)))
                .unwrap();
        }

        let recent = store.recent(2).expect("Could not read recent entries");

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].transaction_id, 3);
        assert_eq!(recent[1].transaction_id, 2);
    }

    #[test]
    fn history_is_empty_for_unknown_transaction() {
        let store = get_store();

        assert_eq!(store.for_transaction(999), Ok(vec![]));
    }
}
