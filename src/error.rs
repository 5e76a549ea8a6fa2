//! Defines the app level error type and its classification into the failure
//! policies applied by the transaction coordinator.

use crate::models::{CategoryKind, DatabaseID, TransactionType};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction was created with a zero, negative, or non-finite amount.
    #[error("transaction amounts must be greater than zero, got {0}")]
    InvalidAmount(f64),

    /// The referenced account does not accept new transactions.
    #[error("account {0} is not active")]
    AccountNotActive(DatabaseID),

    /// The category attached to a transaction applies to a different
    /// transaction type, e.g. an income category on an expense.
    #[error("a {category} category cannot be used with a {transaction} transaction")]
    CategoryKindMismatch {
        /// The side of the ledger the category applies to.
        category: CategoryKind,
        /// The type of the offending transaction.
        transaction: TransactionType,
    },

    /// A goal was referenced by a transaction that is not a contribution.
    #[error("goals can only be referenced by contribution transactions")]
    GoalRequiresContribution,

    /// The requested resource could not be found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account does not exist or is owned by another user.
    #[error("the account could not be found")]
    AccountNotFound,

    /// The goal does not exist or is owned by another user.
    #[error("the goal could not be found")]
    GoalNotFound,

    /// The category does not exist or is owned by another user.
    #[error("the category could not be found")]
    CategoryNotFound,

    /// The transaction does not exist or is owned by another user.
    #[error("the transaction could not be found")]
    TransactionNotFound,

    /// A query was given a foreign key that does not refer to an existing row.
    #[error("a referenced row does not exist in the database")]
    InvalidForeignKey,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

/// The coarse classification of an [Error], which decides how a failure is
/// handled: validation and not-found errors are surfaced immediately and
/// never retried, persistence errors abort a mutation before the commit point
/// and are logged and swallowed after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the caller must change the request.
    Validation,
    /// A referenced entity is missing or not owned by the caller.
    NotFound,
    /// The underlying storage failed.
    Persistence,
}

impl Error {
    /// Classify this error for failure-policy decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_)
            | Error::AccountNotActive(_)
            | Error::CategoryKindMismatch { .. }
            | Error::GoalRequiresContribution => ErrorKind::Validation,
            Error::NotFound
            | Error::AccountNotFound
            | Error::GoalNotFound
            | Error::CategoryNotFound
            | Error::TransactionNotFound
            | Error::InvalidForeignKey => ErrorKind::NotFound,
            Error::DatabaseLock | Error::SqlError(_) => ErrorKind::Persistence,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                Error::InvalidForeignKey
            }
            value => {
                tracing::error!("an unhandled SQL error occurred: {}", value);
                Error::SqlError(value)
            }
        }
    }
}

#[cfg(test)]
mod error_kind_tests {
    use super::{Error, ErrorKind};
    use crate::models::{CategoryKind, TransactionType};

    #[test]
    fn validation_errors_are_classified_as_validation() {
        assert_eq!(ErrorKind::Validation, Error::InvalidAmount(-1.0).kind());
        assert_eq!(ErrorKind::Validation, Error::AccountNotActive(3).kind());
        assert_eq!(
            ErrorKind::Validation,
            Error::CategoryKindMismatch {
                category: CategoryKind::Income,
                transaction: TransactionType::Expense,
            }
            .kind()
        );
    }

    #[test]
    fn missing_references_are_classified_as_not_found() {
        assert_eq!(ErrorKind::NotFound, Error::AccountNotFound.kind());
        assert_eq!(ErrorKind::NotFound, Error::TransactionNotFound.kind());
        assert_eq!(ErrorKind::NotFound, Error::InvalidForeignKey.kind());
    }

    #[test]
    fn storage_failures_are_classified_as_persistence() {
        assert_eq!(ErrorKind::Persistence, Error::DatabaseLock.kind());
        assert_eq!(
            ErrorKind::Persistence,
            Error::SqlError(rusqlite::Error::ExecuteReturnedResults).kind()
        );
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::NotFound,
            Error::from(rusqlite::Error::QueryReturnedNoRows)
        );
    }
}
