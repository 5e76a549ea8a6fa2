//! This module defines the domain data types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use account::{Account, AccountStatus, NewAccount};
pub use audit::{AuditAction, AuditEntry, NewAuditEntry};
pub use category::{Category, CategoryKind, NewCategory};
pub use goal::{Goal, GoalStatus, NewGoal};
pub use transaction::{Transaction, TransactionBuilder, TransactionType};

mod account;
mod audit;
mod category;
mod goal;
mod transaction;

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;

/// The ID of a user.
///
/// Authentication happens outside this crate; a `UserID` is carried on every
/// record purely so that ownership can be checked on reads and mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying integer ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
