//! Defines the `Account` model, the aggregate whose balance is kept in step
//! with the ledger.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{
    db::{CreateTable, MapRow},
    models::{DatabaseID, UserID},
};

/// Whether an account can accept new transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// The account accepts new transactions.
    Active,
    /// The account is temporarily hidden from day-to-day use.
    Inactive,
    /// The account has been closed and is kept for history only.
    Closed,
}

impl AccountStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Closed => "closed",
        }
    }

    /// Parse a status from its database string.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

impl Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account, credit card, or cash wallet.
///
/// `balance` is derived state: it must equal `initial_balance` plus the net
/// signed effect of every non-deleted transaction referencing the account.
/// It is only ever written by the balance reconciler and by ledger replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: DatabaseID,
    /// The ID of the user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// The balance the account was opened with, before any transactions.
    pub initial_balance: f64,
    /// The current balance, derived from the ledger.
    pub balance: f64,
    /// Whether the account accepts new transactions.
    pub status: AccountStatus,
    /// Whether this is the user's default account for new transactions.
    pub is_default: bool,
    /// The ISO 4217 currency code of the account, e.g. "NZD".
    pub currency: String,
}

impl CreateTable for Account {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                initial_balance REAL NOT NULL,
                balance REAL NOT NULL,
                status TEXT NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0,
                currency TEXT NOT NULL
            )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Account {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let status_text: String = row.get(offset + 5)?;
        let status = AccountStatus::parse(&status_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 5,
                rusqlite::types::Type::Text,
                format!("unknown account status \"{status_text}\"").into(),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            name: row.get(offset + 2)?,
            initial_balance: row.get(offset + 3)?,
            balance: row.get(offset + 4)?,
            status,
            is_default: row.get(offset + 6)?,
            currency: row.get(offset + 7)?,
        })
    }
}

/// The details needed to create an [Account].
///
/// The balance starts equal to `initial_balance`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAccount {
    /// The ID of the user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// The balance the account is opened with.
    pub initial_balance: f64,
    /// Whether the account accepts new transactions.
    pub status: AccountStatus,
    /// Whether this is the user's default account.
    pub is_default: bool,
    /// The ISO 4217 currency code of the account.
    pub currency: String,
}
