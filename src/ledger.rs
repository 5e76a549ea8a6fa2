//! Wires the stores, reconcilers, and background machinery into one entry
//! point for callers.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    audit::AuditRecorder,
    balance::BalanceReconciler,
    coordinator::TransactionCoordinator,
    db::initialize,
    goal_progress::GoalProgressUpdater,
    models::{
        Account, AuditEntry, Category, DatabaseID, Goal, NewAccount, NewCategory, NewGoal,
        Transaction, TransactionBuilder, UserID,
    },
    notifier::{ChangeFilter, ChangeNotifier, EntityKind, Subscription},
    outbox::{DeadLetter, Outbox},
    replay,
    stores::{
        AccountStore, AuditStore, CategoryStore, GoalStore, TransactionQuery, TransactionStore,
        sqlite::{
            SQLiteAccountStore, SQLiteAuditStore, SQLiteCategoryStore, SQLiteGoalStore,
            SQLiteTransactionStore,
        },
    },
};

/// Tunables for a [Ledger].
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// How many change events each subscriber may queue before the oldest are
    /// dropped.
    pub notifier_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            notifier_capacity: 64,
        }
    }
}

/// The assembled reconciliation subsystem.
///
/// Owns the transaction coordinator, the change notifier, and the outbox
/// worker, and exposes the read paths callers need around them. Mutations go
/// through [create_transaction](Ledger::create_transaction) and
/// [delete_transaction](Ledger::delete_transaction); everything derived
/// (balances, goal progress, audit history, change events) follows from
/// those.
pub struct Ledger<T, A, G, C, D>
where
    T: TransactionStore,
    A: AccountStore,
    G: GoalStore,
    C: CategoryStore,
    D: AuditStore,
{
    coordinator: TransactionCoordinator<T, A, G, C>,
    transactions: T,
    accounts: A,
    goals: G,
    categories: C,
    audit: AuditRecorder<D>,
    notifier: ChangeNotifier,
    outbox: Outbox,
}

impl<T, A, G, C, D> Ledger<T, A, G, C, D>
where
    T: TransactionStore + Clone,
    A: AccountStore + Clone + Send + 'static,
    G: GoalStore + Clone + Send + 'static,
    C: CategoryStore + Clone,
    D: AuditStore + Clone + Send + 'static,
{
    /// Assemble a ledger over the given stores.
    ///
    /// Spawns the outbox worker, so this must be called within a Tokio
    /// runtime.
    pub fn new(
        transactions: T,
        accounts: A,
        goals: G,
        categories: C,
        audit: D,
        config: LedgerConfig,
    ) -> Self {
        let notifier = ChangeNotifier::new(config.notifier_capacity);
        let outbox = Outbox::spawn(
            BalanceReconciler::new(accounts.clone()),
            GoalProgressUpdater::new(goals.clone()),
            AuditRecorder::new(audit.clone()),
            notifier.clone(),
        );
        let coordinator = TransactionCoordinator::new(
            transactions.clone(),
            accounts.clone(),
            goals.clone(),
            categories.clone(),
            notifier.clone(),
            outbox.clone(),
        );

        Self {
            coordinator,
            transactions,
            accounts,
            goals,
            categories,
            audit: AuditRecorder::new(audit),
            notifier,
            outbox,
        }
    }
}

impl<T, A, G, C, D> Ledger<T, A, G, C, D>
where
    T: TransactionStore,
    A: AccountStore,
    G: GoalStore,
    C: CategoryStore,
    D: AuditStore,
{
    /// Validate and record a new transaction; see
    /// [TransactionCoordinator::create_transaction].
    ///
    /// # Errors
    /// Returns the validation or persistence error that prevented the
    /// transaction from being recorded.
    pub fn create_transaction(
        &mut self,
        builder: TransactionBuilder,
    ) -> Result<Transaction, Error> {
        self.coordinator.create_transaction(builder)
    }

    /// Remove a transaction and reverse its effects; see
    /// [TransactionCoordinator::delete_transaction].
    ///
    /// # Errors
    /// Returns [Error::TransactionNotFound] if `id` does not refer to a
    /// transaction owned by `user_id`.
    pub fn delete_transaction(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        self.coordinator.delete_transaction(id, user_id)
    }

    /// Open an account.
    ///
    /// # Errors
    /// Returns a persistence error if the account could not be created.
    pub fn create_account(&mut self, account: NewAccount) -> Result<Account, Error> {
        self.accounts.create(account)
    }

    /// Create a savings goal with no progress.
    ///
    /// # Errors
    /// Returns a persistence error if the goal could not be created.
    pub fn create_goal(&mut self, goal: NewGoal) -> Result<Goal, Error> {
        self.goals.create(goal)
    }

    /// Create a transaction category.
    ///
    /// # Errors
    /// Returns a persistence error if the category could not be created.
    pub fn create_category(&mut self, category: NewCategory) -> Result<Category, Error> {
        self.categories.create(category)
    }

    /// Retrieve an account.
    ///
    /// # Errors
    /// Returns [Error::AccountNotFound] if `id` does not refer to a valid
    /// account.
    pub fn account(&self, id: DatabaseID) -> Result<Account, Error> {
        self.accounts.get(id)
    }

    /// Retrieve a savings goal.
    ///
    /// # Errors
    /// Returns [Error::GoalNotFound] if `id` does not refer to a valid goal.
    pub fn goal(&self, id: DatabaseID) -> Result<Goal, Error> {
        self.goals.get(id)
    }

    /// Retrieve a transaction.
    ///
    /// # Errors
    /// Returns [Error::TransactionNotFound] if `id` does not refer to a valid
    /// transaction.
    pub fn transaction(&self, id: DatabaseID) -> Result<Transaction, Error> {
        self.transactions.get(id)
    }

    /// Retrieve transactions matching `query`.
    ///
    /// # Errors
    /// Returns a persistence error if the ledger could not be read.
    pub fn transactions(&self, query: TransactionQuery) -> Result<Vec<Transaction>, Error> {
        self.transactions.get_query(query)
    }

    /// The audit history of a transaction, oldest first. The history survives
    /// the transaction's deletion.
    ///
    /// # Errors
    /// Returns a persistence error if the history could not be read.
    pub fn audit_history(&self, transaction_id: DatabaseID) -> Result<Vec<AuditEntry>, Error> {
        self.audit.history_for_transaction(transaction_id)
    }

    /// Subscribe to change events for one entity kind, starting from the next
    /// published event.
    pub fn subscribe(&self, entity: EntityKind, filter: ChangeFilter) -> Subscription {
        self.notifier.subscribe(entity, filter)
    }

    /// Wait until every queued post-commit task has been processed.
    pub async fn flush(&self) {
        self.outbox.flush().await;
    }

    /// Take the post-commit tasks that failed since the last call.
    pub fn take_dead_letters(&self) -> Vec<DeadLetter> {
        self.outbox.take_dead_letters()
    }

    /// Recompute an account's balance from the ledger; see
    /// [replay::rebuild_account_balance].
    ///
    /// # Errors
    /// Returns [Error::AccountNotFound] if `account_id` does not refer to a
    /// valid account.
    pub fn rebuild_account_balance(&mut self, account_id: DatabaseID) -> Result<f64, Error> {
        replay::rebuild_account_balance(&self.transactions, &mut self.accounts, account_id)
    }

    /// Recompute a goal's progress from the ledger; see
    /// [replay::rebuild_goal_progress].
    ///
    /// # Errors
    /// Returns [Error::GoalNotFound] if `goal_id` does not refer to a valid
    /// goal.
    pub fn rebuild_goal_progress(&mut self, goal_id: DatabaseID) -> Result<Goal, Error> {
        replay::rebuild_goal_progress(&self.transactions, &mut self.goals, goal_id)
    }
}

/// A [Ledger] backed entirely by SQLite stores sharing one connection.
pub type SQLLedger = Ledger<
    SQLiteTransactionStore,
    SQLiteAccountStore,
    SQLiteGoalStore,
    SQLiteCategoryStore,
    SQLiteAuditStore,
>;

/// Initialize the database schema on `connection` and assemble a [SQLLedger]
/// over it.
///
/// Spawns the outbox worker, so this must be called within a Tokio runtime.
///
/// # Errors
/// Returns a persistence error if the schema could not be created.
pub fn create_ledger(connection: Connection, config: LedgerConfig) -> Result<SQLLedger, Error> {
    initialize(&connection)?;
    let connection = Arc::new(Mutex::new(connection));

    Ok(Ledger::new(
        SQLiteTransactionStore::new(connection.clone()),
        SQLiteAccountStore::new(connection.clone()),
        SQLiteGoalStore::new(connection.clone()),
        SQLiteCategoryStore::new(connection.clone()),
        SQLiteAuditStore::new(connection),
        config,
    ))
}
