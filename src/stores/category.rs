//! Defines the category store trait.

use crate::{
    Error,
    models::{Category, DatabaseID, NewCategory},
};

/// Handles the creation and retrieval of categories.
///
/// Reconciliation treats categories as read-only; creation exists for the
/// admin surfaces that call into this crate and for tests.
pub trait CategoryStore {
    /// Create a new category in the store.
    fn create(&mut self, category: NewCategory) -> Result<Category, Error>;

    /// Retrieve a category from the store.
    fn get(&self, id: DatabaseID) -> Result<Category, Error>;
}
