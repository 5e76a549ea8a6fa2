//! This file defines the `Category` type. A category acts like a label for a
//! transaction; reconciliation only reads categories to check that a
//! transaction's type agrees with the category it claims.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{
    db::{CreateTable, MapRow},
    models::{DatabaseID, TransactionType, UserID},
};

/// The side of the ledger a category applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// The category labels income transactions, e.g. "Salary".
    Income,
    /// The category labels expense transactions, e.g. "Groceries".
    Expense,
}

impl CategoryKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }

    /// Parse a category kind from its database string.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(CategoryKind::Income),
            "expense" => Some(CategoryKind::Expense),
            _ => None,
        }
    }

    /// Whether a transaction of type `kind` may carry a category of this kind.
    ///
    /// Transfers and contributions carry no category, so they match nothing.
    pub fn matches(&self, kind: TransactionType) -> bool {
        matches!(
            (self, kind),
            (CategoryKind::Income, TransactionType::Income)
                | (CategoryKind::Expense, TransactionType::Expense)
        )
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-defined label for transactions of a single kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: DatabaseID,
    /// The ID of the user that owns the category.
    pub user_id: UserID,
    /// The display name of the category.
    pub name: String,
    /// The side of the ledger the category applies to.
    pub kind: CategoryKind,
}

impl CreateTable for Category {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL
            )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Category {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let kind_text: String = row.get(offset + 3)?;
        let kind = CategoryKind::parse(&kind_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 3,
                rusqlite::types::Type::Text,
                format!("unknown category kind \"{kind_text}\"").into(),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            name: row.get(offset + 2)?,
            kind,
        })
    }
}

/// The details needed to create a [Category].
#[derive(Clone, Debug, PartialEq)]
pub struct NewCategory {
    /// The ID of the user that owns the category.
    pub user_id: UserID,
    /// The display name of the category.
    pub name: String,
    /// The side of the ledger the category applies to.
    pub kind: CategoryKind,
}

#[cfg(test)]
mod category_kind_tests {
    use super::CategoryKind;
    use crate::models::TransactionType;

    #[test]
    fn kinds_match_their_own_transaction_type() {
        assert!(CategoryKind::Income.matches(TransactionType::Income));
        assert!(CategoryKind::Expense.matches(TransactionType::Expense));
    }

    #[test]
    fn kinds_reject_the_opposite_transaction_type() {
        assert!(!CategoryKind::Income.matches(TransactionType::Expense));
        assert!(!CategoryKind::Expense.matches(TransactionType::Income));
    }

    #[test]
    fn transfers_and_contributions_match_nothing() {
        for kind in [CategoryKind::Income, CategoryKind::Expense] {
            assert!(!kind.matches(TransactionType::TransferIn));
            assert!(!kind.matches(TransactionType::TransferOut));
            assert!(!kind.matches(TransactionType::Contribution));
        }
    }
}
