//! Contains traits and implementations for objects that store the domain
//! [models](crate::models).
//!
//! The traits split the storage surface along the ownership lines of the
//! reconciliation core: the transaction store is the ledger (source of
//! truth), the account and goal stores hold the derived aggregates, and the
//! audit store is append-only history.

mod account;
mod audit;
mod category;
mod goal;
mod transaction;

pub mod sqlite;

pub use account::AccountStore;
pub use audit::AuditStore;
pub use category::CategoryStore;
pub use goal::GoalStore;
pub use transaction::{SortOrder, TransactionQuery, TransactionStore};
