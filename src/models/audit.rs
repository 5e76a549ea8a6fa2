//! Defines the append-only `AuditEntry` model recording who changed the
//! ledger, what changed, and why.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use time::OffsetDateTime;

use crate::{
    db::{CreateTable, MapRow},
    models::{DatabaseID, Transaction, UserID},
};

/// What happened to the subject transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The transaction was written to the ledger.
    Created,
    /// The transaction was removed from the ledger.
    Deleted,
}

impl AuditAction {
    /// The string stored in the database for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Deleted => "deleted",
        }
    }

    /// Parse an action from its database string.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "created" => Some(AuditAction::Created),
            "deleted" => Some(AuditAction::Deleted),
            _ => None,
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record of a single ledger mutation.
///
/// Audit entries are append-only and deliberately carry no foreign key to the
/// transaction table: the entry must outlive the transaction it describes.
/// Snapshots are the transaction serialized as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The ID of the audit entry.
    pub id: DatabaseID,
    /// The ID of the transaction that was created or deleted.
    pub transaction_id: DatabaseID,
    /// What happened to the transaction.
    pub action: AuditAction,
    /// JSON snapshot of the transaction before the mutation, if it existed.
    pub before: Option<String>,
    /// JSON snapshot of the transaction after the mutation, if it still exists.
    pub after: Option<String>,
    /// The ID of the user that performed the mutation.
    pub actor_id: UserID,
    /// When the mutation happened.
    pub at: OffsetDateTime,
    /// The description carried by the transaction at mutation time.
    pub note: String,
}

impl CreateTable for AuditEntry {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS audit_entry (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                before_snapshot TEXT,
                after_snapshot TEXT,
                actor_id INTEGER NOT NULL,
                at TEXT NOT NULL,
                note TEXT NOT NULL
            )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for AuditEntry {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let action_text: String = row.get(offset + 2)?;
        let action = AuditAction::parse(&action_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 2,
                rusqlite::types::Type::Text,
                format!("unknown audit action \"{action_text}\"").into(),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            transaction_id: row.get(offset + 1)?,
            action,
            before: row.get(offset + 3)?,
            after: row.get(offset + 4)?,
            actor_id: UserID::new(row.get(offset + 5)?),
            at: row.get(offset + 6)?,
            note: row.get(offset + 7)?,
        })
    }
}

/// The details needed to append an [AuditEntry].
#[derive(Clone, Debug, PartialEq)]
pub struct NewAuditEntry {
    /// The ID of the transaction that was created or deleted.
    pub transaction_id: DatabaseID,
    /// What happened to the transaction.
    pub action: AuditAction,
    /// JSON snapshot of the transaction before the mutation.
    pub before: Option<String>,
    /// JSON snapshot of the transaction after the mutation.
    pub after: Option<String>,
    /// The ID of the user that performed the mutation.
    pub actor_id: UserID,
    /// When the mutation happened.
    pub at: OffsetDateTime,
    /// The description carried by the transaction at mutation time.
    pub note: String,
}

impl NewAuditEntry {
    /// An entry recording that `transaction` was written to the ledger.
    pub fn created(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id,
            action: AuditAction::Created,
            before: None,
            after: snapshot(transaction),
            actor_id: transaction.user_id,
            at: OffsetDateTime::now_utc(),
            note: transaction.note.clone(),
        }
    }

    /// An entry recording that `transaction` was removed from the ledger.
    pub fn deleted(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id,
            action: AuditAction::Deleted,
            before: snapshot(transaction),
            after: None,
            actor_id: transaction.user_id,
            at: OffsetDateTime::now_utc(),
            note: transaction.note.clone(),
        }
    }
}

fn snapshot(transaction: &Transaction) -> Option<String> {
    match serde_json::to_string(transaction) {
        Ok(json) => Some(json),
        Err(error) => {
            tracing::error!(
                transaction_id = transaction.id,
                "could not serialize transaction snapshot: {error}"
            );
            None
        }
    }
}
