//! Defines the transaction store trait, the interface to the ledger.

use std::ops::RangeInclusive;

use time::Date;

use crate::{
    Error,
    models::{DatabaseID, Transaction, TransactionBuilder, UserID},
};

/// Handles the creation, retrieval, and deletion of transactions.
///
/// The ledger is append/delete only: there is no update operation, and the
/// aggregate reconcilers never touch it.
pub trait TransactionStore {
    /// Create a new transaction in the store.
    fn create(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error>;

    /// Retrieve a transaction from the store.
    fn get(&self, id: DatabaseID) -> Result<Transaction, Error>;

    /// Remove a transaction from the store.
    ///
    /// # Errors
    /// Returns [Error::TransactionNotFound] if `id` does not refer to a
    /// transaction in the store.
    fn delete(&mut self, id: DatabaseID) -> Result<(), Error>;

    /// Retrieve transactions from the store in the way defined by `query`.
    fn get_query(&self, query: TransactionQuery) -> Result<Vec<Transaction>, Error>;
}

/// Defines how transactions should be fetched from [TransactionStore::get_query].
///
/// The account/category/goal filters are backed by a secondary index and are
/// the read path used for related-transaction lookups and aggregate replay.
#[derive(Clone, Debug, Default)]
pub struct TransactionQuery {
    /// Include only transactions owned by this user.
    pub user_id: Option<UserID>,
    /// Include only transactions on this account.
    pub account_id: Option<DatabaseID>,
    /// Include only transactions with this category.
    pub category_id: Option<DatabaseID>,
    /// Include only transactions contributing to this goal.
    pub goal_id: Option<DatabaseID>,
    /// Include transactions within `date_range` (inclusive).
    pub date_range: Option<RangeInclusive<Date>>,
    /// Selects up to the first N (`limit`) transactions.
    pub limit: Option<u64>,
    /// Orders transactions by date in the order `sort_date`. None returns
    /// transactions in the order they are stored.
    pub sort_date: Option<SortOrder>,
}

/// The order to sort transactions in a [TransactionQuery].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}
