//! SQLite backed implementations of the [store traits](crate::stores).
//!
//! All stores share a single `Arc<Mutex<Connection>>`; cloning a store is
//! cheap and clones operate on the same database.

pub mod account;
pub mod audit;
pub mod category;
pub mod goal;
pub mod transaction;

pub use account::SQLiteAccountStore;
pub use audit::SQLiteAuditStore;
pub use category::SQLiteCategoryStore;
pub use goal::SQLiteGoalStore;
pub use transaction::SQLiteTransactionStore;
