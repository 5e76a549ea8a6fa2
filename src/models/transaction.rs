//! This file defines the type `Transaction`, the source-of-truth record of the
//! ledger, and the builder used to create one.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use time::{Date, OffsetDateTime};

use crate::{
    db::{CreateTable, MapRow},
    models::{DatabaseID, UserID},
};

/// The type of a transaction, which determines the sign of its effect on the
/// owning account's balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money earned, e.g. a salary payment.
    Income,
    /// Money spent.
    Expense,
    /// Money moved into the account from another account.
    TransferIn,
    /// Money moved out of the account to another account.
    TransferOut,
    /// Money set aside from the account towards a savings goal.
    Contribution,
}

impl TransactionType {
    /// The string stored in the database for this transaction type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Contribution => "contribution",
        }
    }

    /// Parse a transaction type from its database string.
    ///
    /// Returns `None` if `text` is not a known transaction type.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            "contribution" => Some(TransactionType::Contribution),
            _ => None,
        }
    }

    /// The sign of this transaction type's effect on the owning account's
    /// balance.
    ///
    /// Income and incoming transfers add money, everything else removes it.
    /// A contribution moves money out of the account and into a goal, so it
    /// counts as negative here and positive on the goal's progress.
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::Income | TransactionType::TransferIn => 1.0,
            TransactionType::Expense
            | TransactionType::TransferOut
            | TransactionType::Contribution => -1.0,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event where money entered or left an account.
///
/// A transaction is immutable once created: reconciliation reads it but never
/// writes it, and the only way to undo one is to delete it. To create a new
/// `Transaction`, use [Transaction::build] and pass the builder to the
/// transaction store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseID,
    /// The ID of the user that owns this transaction.
    pub user_id: UserID,
    /// The account the money entered or left.
    pub account_id: DatabaseID,
    /// An optional user-defined category describing the transaction.
    pub category_id: Option<DatabaseID>,
    /// The savings goal this transaction contributes to, if any.
    ///
    /// Only set on [TransactionType::Contribution] transactions.
    pub goal_id: Option<DatabaseID>,
    /// The type of the transaction.
    pub kind: TransactionType,
    /// The magnitude of the transaction. Always non-negative; the sign of the
    /// effect on the account balance is derived from `kind`.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub note: String,
    /// When the transaction record was created.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder::new] for discoverability.
    pub fn build(
        amount: f64,
        kind: TransactionType,
        account_id: DatabaseID,
        user_id: UserID,
    ) -> TransactionBuilder {
        TransactionBuilder::new(amount, kind, account_id, user_id)
    }

    /// The signed effect of this transaction on the owning account's balance.
    pub fn signed_amount(&self) -> f64 {
        self.kind.sign() * self.amount
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL REFERENCES account(id),
                category_id INTEGER REFERENCES category(id),
                goal_id INTEGER REFERENCES goal(id),
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                note TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            (),
        )?;

        // Covers the related-transaction lookups used by external read paths
        // and by aggregate replay.
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_transaction_refs
             ON \"transaction\" (account_id, category_id, goal_id)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let kind_text: String = row.get(offset + 5)?;
        let kind = TransactionType::parse(&kind_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 5,
                rusqlite::types::Type::Text,
                format!("unknown transaction type \"{kind_text}\"").into(),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            account_id: row.get(offset + 2)?,
            category_id: row.get(offset + 3)?,
            goal_id: row.get(offset + 4)?,
            kind,
            amount: row.get(offset + 6)?,
            date: row.get(offset + 7)?,
            note: row.get(offset + 8)?,
            created_at: row.get(offset + 9)?,
        })
    }
}

/// A builder for creating [Transaction] records.
///
/// The date defaults to today (UTC) and the note to an empty string; category
/// and goal references are unset unless provided.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionBuilder {
    /// The ID of the user creating the transaction.
    pub user_id: UserID,
    /// The account the money entered or left.
    pub account_id: DatabaseID,
    /// An optional category for the transaction.
    pub category_id: Option<DatabaseID>,
    /// The goal a contribution is directed at.
    pub goal_id: Option<DatabaseID>,
    /// The type of the transaction.
    pub kind: TransactionType,
    /// The magnitude of the transaction.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub note: String,
}

impl TransactionBuilder {
    /// Create a builder with the required fields.
    pub fn new(
        amount: f64,
        kind: TransactionType,
        account_id: DatabaseID,
        user_id: UserID,
    ) -> Self {
        Self {
            user_id,
            account_id,
            category_id: None,
            goal_id: None,
            kind,
            amount,
            date: OffsetDateTime::now_utc().date(),
            note: String::new(),
        }
    }

    /// Set the category of the transaction.
    pub fn category(mut self, category_id: Option<DatabaseID>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the goal the transaction contributes to.
    pub fn goal(mut self, goal_id: Option<DatabaseID>) -> Self {
        self.goal_id = goal_id;
        self
    }

    /// Set the date the transaction happened.
    pub fn date(mut self, date: Date) -> Self {
        self.date = date;
        self
    }

    /// Set the description of the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_owned();
        self
    }
}
