//! Defines the `Goal` model, a savings target whose progress is derived from
//! contribution transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{
    db::{CreateTable, MapRow},
    models::{DatabaseID, UserID},
};

/// Whether a goal has reached its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// The goal has not yet reached its target amount.
    InProgress,
    /// The goal's progress has reached or passed its target amount.
    Completed,
}

impl GoalStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Completed => "completed",
        }
    }

    /// Parse a status from its database string.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "in_progress" => Some(GoalStatus::InProgress),
            "completed" => Some(GoalStatus::Completed),
            _ => None,
        }
    }

    /// The status implied by a progress amount against a target.
    ///
    /// The status flips back to in-progress if progress falls below the
    /// target again, e.g. after a contribution is deleted.
    pub fn derive(current_amount: f64, target_amount: f64) -> Self {
        if current_amount >= target_amount {
            GoalStatus::Completed
        } else {
            GoalStatus::InProgress
        }
    }
}

impl Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A savings goal, e.g. "Holiday fund: $500".
///
/// `current_amount` and `status` are derived state: `current_amount` must
/// equal the sum of every non-deleted contribution transaction referencing
/// the goal, clamped at zero, and `status` follows from comparing it to
/// `target_amount`. Both are only ever written by the goal progress updater
/// and by ledger replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: DatabaseID,
    /// The ID of the user that owns the goal.
    pub user_id: UserID,
    /// The display name of the goal.
    pub name: String,
    /// The progress towards the target, derived from the ledger.
    pub current_amount: f64,
    /// The amount of money the user wants to save.
    pub target_amount: f64,
    /// Whether the goal has reached its target.
    pub status: GoalStatus,
}

impl CreateTable for Goal {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                target_amount REAL NOT NULL,
                status TEXT NOT NULL
            )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Goal {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let status_text: String = row.get(offset + 5)?;
        let status = GoalStatus::parse(&status_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 5,
                rusqlite::types::Type::Text,
                format!("unknown goal status \"{status_text}\"").into(),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            name: row.get(offset + 2)?,
            current_amount: row.get(offset + 3)?,
            target_amount: row.get(offset + 4)?,
            status,
        })
    }
}

/// The details needed to create a [Goal].
///
/// Progress starts at zero and the status in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct NewGoal {
    /// The ID of the user that owns the goal.
    pub user_id: UserID,
    /// The display name of the goal.
    pub name: String,
    /// The amount of money the user wants to save.
    pub target_amount: f64,
}
