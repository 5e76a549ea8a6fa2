//! Ledgerkeep keeps the derived aggregates of a personal budget in step with
//! its transaction ledger.
//!
//! The ledger is the source of truth: every account balance and every savings
//! goal's progress must be recomputable from it. Mutations go through the
//! [TransactionCoordinator] (usually via the [Ledger] facade), which
//! validates, writes the ledger, and then propagates the effects off the
//! critical path: balance and goal reconciliation, audit history, and change
//! events for connected sessions all run on a background [Outbox] worker.
//!
//! ```no_run
//! use ledgerkeep::{
//!     LedgerConfig, create_ledger,
//!     models::{Transaction, TransactionType, UserID},
//! };
//!
//! # async fn example() -> Result<(), ledgerkeep::Error> {
//! let connection = rusqlite::Connection::open("budget.db")?;
//! let mut ledger = create_ledger(connection, LedgerConfig::default())?;
//!
//! let transaction = ledger.create_transaction(Transaction::build(
//!     19.99,
//!     TransactionType::Expense,
//!     1,
//!     UserID::new(1),
//! ))?;
//! ledger.flush().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod audit;
mod balance;
mod coordinator;
pub mod db;
mod error;
mod goal_progress;
mod ledger;
pub mod models;
mod notifier;
mod outbox;
pub mod replay;
pub mod stores;

pub use audit::AuditRecorder;
pub use balance::BalanceReconciler;
pub use coordinator::TransactionCoordinator;
pub use error::{Error, ErrorKind};
pub use goal_progress::GoalProgressUpdater;
pub use ledger::{Ledger, LedgerConfig, SQLLedger, create_ledger};
pub use notifier::{
    ChangeEvent, ChangeFilter, ChangeKind, ChangeNotifier, EntityKind, Subscription,
};
pub use outbox::{DeadLetter, Outbox, Task};
