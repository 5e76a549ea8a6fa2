//! Defines the store for accounts, the aggregate side of the ledger.

use crate::{
    Error,
    models::{Account, DatabaseID, NewAccount},
};

/// Handles the creation and retrieval of accounts and the two write paths for
/// their derived balance.
pub trait AccountStore {
    /// Create a new account in the store with its balance set to the initial
    /// balance.
    fn create(&mut self, account: NewAccount) -> Result<Account, Error>;

    /// Retrieve an account from the store.
    fn get(&self, id: DatabaseID) -> Result<Account, Error>;

    /// Add `delta` to the account's balance in a single atomic operation and
    /// return the new balance.
    ///
    /// This is the preferred write path: it cannot lose a concurrent update.
    fn increment_balance(&mut self, id: DatabaseID, delta: f64) -> Result<f64, Error>;

    /// Overwrite the account's balance.
    ///
    /// This is the write half of the non-atomic fallback path; callers are
    /// expected to have read the current balance first and accept that a
    /// concurrent writer may be lost.
    fn set_balance(&mut self, id: DatabaseID, balance: f64) -> Result<(), Error>;
}
