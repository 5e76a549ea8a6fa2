//! Orchestrates ledger mutations and the propagation of their effects.

use crate::{
    Error,
    models::{
        AccountStatus, DatabaseID, NewAuditEntry, Transaction, TransactionBuilder,
        TransactionType, UserID,
    },
    notifier::{ChangeEvent, ChangeKind, ChangeNotifier, EntityKind},
    outbox::{Outbox, Task},
    stores::{AccountStore, CategoryStore, GoalStore, TransactionStore},
};

/// Coordinates the create/delete of a transaction with balance
/// reconciliation, goal progress, change notification, and audit history.
///
/// The ledger write or delete is the commit point: the caller is told
/// "success" as soon as it completes, and the two reconciliation calls plus
/// the audit write run afterwards on the [Outbox] worker without being
/// awaited. Until that work drains, a concurrent reader may observe aggregate
/// values that have not caught up with the ledger. There is no compensating
/// rollback of the ledger entry when a post-commit step fails; failures land
/// on the outbox's dead-letter list instead.
pub struct TransactionCoordinator<T, A, G, C> {
    transactions: T,
    accounts: A,
    goals: G,
    categories: C,
    notifier: ChangeNotifier,
    outbox: Outbox,
}

impl<T, A, G, C> TransactionCoordinator<T, A, G, C>
where
    T: TransactionStore,
    A: AccountStore,
    G: GoalStore,
    C: CategoryStore,
{
    /// Create a coordinator over the given stores.
    pub fn new(
        transactions: T,
        accounts: A,
        goals: G,
        categories: C,
        notifier: ChangeNotifier,
        outbox: Outbox,
    ) -> Self {
        Self {
            transactions,
            accounts,
            goals,
            categories,
            notifier,
            outbox,
        }
    }

    /// Validate `builder`, write the transaction to the ledger, and queue the
    /// propagation of its effects.
    ///
    /// Validation happens before anything is written: the amount must be a
    /// positive finite number, the account must exist, belong to the caller
    /// and be active, a category (if given) must belong to the caller and
    /// apply to the transaction's type, and a goal (if given) may only be
    /// referenced by a contribution owned by the caller.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidAmount] if the amount is zero, negative, or not
    ///   finite,
    /// - [Error::AccountNotFound] / [Error::CategoryNotFound] /
    ///   [Error::GoalNotFound] if a referenced entity is missing or owned by
    ///   another user,
    /// - [Error::AccountNotActive] if the account does not accept new
    ///   transactions,
    /// - [Error::CategoryKindMismatch] if the category disagrees with the
    ///   transaction's type,
    /// - [Error::GoalRequiresContribution] if a goal is referenced by a
    ///   non-contribution,
    /// - or a persistence error if the ledger write fails, in which case no
    ///   reconciliation is attempted.
    pub fn create_transaction(
        &mut self,
        builder: TransactionBuilder,
    ) -> Result<Transaction, Error> {
        if !builder.amount.is_finite() || builder.amount <= 0.0 {
            return Err(Error::InvalidAmount(builder.amount));
        }

        let account = self.accounts.get(builder.account_id)?;
        if account.user_id != builder.user_id {
            return Err(Error::AccountNotFound);
        }
        if account.status != AccountStatus::Active {
            return Err(Error::AccountNotActive(account.id));
        }

        if let Some(category_id) = builder.category_id {
            let category = self.categories.get(category_id)?;
            if category.user_id != builder.user_id {
                return Err(Error::CategoryNotFound);
            }
            if !category.kind.matches(builder.kind) {
                return Err(Error::CategoryKindMismatch {
                    category: category.kind,
                    transaction: builder.kind,
                });
            }
        }

        if let Some(goal_id) = builder.goal_id {
            if builder.kind != TransactionType::Contribution {
                return Err(Error::GoalRequiresContribution);
            }

            let goal = self.goals.get(goal_id)?;
            if goal.user_id != builder.user_id {
                return Err(Error::GoalNotFound);
            }
        }

        // Commit point. A failure here aborts the whole mutation.
        let transaction = self.transactions.create(builder)?;

        self.notifier.publish(ChangeEvent::new(
            EntityKind::Transaction,
            transaction.id,
            ChangeKind::Created,
        ));
        self.queue_side_effects(&transaction, 1.0);

        Ok(transaction)
    }

    /// Remove transaction `id` from the ledger and queue the reversal of its
    /// effects.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::TransactionNotFound] if `id` does not refer to a transaction
    ///   owned by `user_id`,
    /// - or a persistence error if the ledger delete fails, in which case no
    ///   reconciliation is attempted.
    pub fn delete_transaction(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        let transaction = self.transactions.get(id)?;
        if transaction.user_id != user_id {
            // Another user's transaction is presented as missing rather than
            // forbidden.
            return Err(Error::TransactionNotFound);
        }

        // Commit point.
        self.transactions.delete(id)?;

        self.notifier.publish(ChangeEvent::new(
            EntityKind::Transaction,
            transaction.id,
            ChangeKind::Deleted,
        ));
        self.queue_side_effects(&transaction, -1.0);

        Ok(())
    }

    /// Queue balance, goal, and audit work for a committed mutation.
    ///
    /// `direction` is `1.0` for a create and `-1.0` for a delete, which
    /// negates every delta so a delete exactly reverses its create.
    fn queue_side_effects(&self, transaction: &Transaction, direction: f64) {
        self.outbox.enqueue(Task::AdjustBalance {
            account_id: transaction.account_id,
            delta: direction * transaction.signed_amount(),
        });

        if transaction.kind == TransactionType::Contribution
            && let Some(goal_id) = transaction.goal_id
        {
            self.outbox.enqueue(Task::AdjustGoalProgress {
                goal_id,
                delta: direction * transaction.amount,
            });
        }

        let entry = if direction > 0.0 {
            NewAuditEntry::created(transaction)
        } else {
            NewAuditEntry::deleted(transaction)
        };
        self.outbox.enqueue(Task::RecordAudit(entry));
    }
}

#[cfg(test)]
mod transaction_coordinator_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use super::TransactionCoordinator;
    use crate::{
        Error,
        audit::AuditRecorder,
        balance::BalanceReconciler,
        db::initialize,
        goal_progress::GoalProgressUpdater,
        models::{
            Account, AccountStatus, AuditAction, CategoryKind, Goal, GoalStatus, NewAccount,
            NewCategory, NewGoal, Transaction, TransactionType, UserID,
        },
        notifier::{ChangeFilter, ChangeKind, ChangeNotifier, EntityKind},
        outbox::Outbox,
        stores::{
            AccountStore, AuditStore, CategoryStore, GoalStore, TransactionStore,
            sqlite::{
                SQLiteAccountStore, SQLiteAuditStore, SQLiteCategoryStore, SQLiteGoalStore,
                SQLiteTransactionStore,
            },
        },
    };

    type SQLCoordinator = TransactionCoordinator<
        SQLiteTransactionStore,
        SQLiteAccountStore,
        SQLiteGoalStore,
        SQLiteCategoryStore,
    >;

    struct Fixture {
        coordinator: SQLCoordinator,
        accounts: SQLiteAccountStore,
        goals: SQLiteGoalStore,
        categories: SQLiteCategoryStore,
        transactions: SQLiteTransactionStore,
        audit: SQLiteAuditStore,
        notifier: ChangeNotifier,
        outbox: Outbox,
        user: UserID,
    }

    fn get_fixture() -> Fixture {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));

        let transactions = SQLiteTransactionStore::new(connection.clone());
        let accounts = SQLiteAccountStore::new(connection.clone());
        let goals = SQLiteGoalStore::new(connection.clone());
        let categories = SQLiteCategoryStore::new(connection.clone());
        let audit = SQLiteAuditStore::new(connection);

        let notifier = ChangeNotifier::new(16);
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

        Fixture {
            coordinator,
            accounts,
            goals,
            categories,
            transactions,
            audit,
            notifier,
            outbox,
            user: UserID::new(1),
        }
    }

    fn create_account(fixture: &mut Fixture, initial_balance: f64) -> Account {
        create_account_with_status(fixture, initial_balance, AccountStatus::Active)
    }

    fn create_account_with_status(
        fixture: &mut Fixture,
        initial_balance: f64,
        status: AccountStatus,
    ) -> Account {
        fixture
            .accounts
            .create(NewAccount {
                user_id: fixture.user,
                name: "Everyday".to_owned(),
                initial_balance,
                status,
                is_default: true,
                currency: "NZD".to_owned(),
            })
            .expect("Could not create account")
    }

    fn create_goal(fixture: &mut Fixture, target_amount: f64, current_amount: f64) -> Goal {
        let goal = fixture
            .goals
            .create(NewGoal {
                user_id: fixture.user,
                name: "Holiday".to_owned(),
                target_amount,
            })
            .expect("Could not create goal");

        if current_amount != 0.0 {
            fixture
                .goals
                .set_progress(
                    goal.id,
                    current_amount,
                    GoalStatus::derive(current_amount, target_amount),
                )
                .unwrap();
        }

        fixture.goals.get(goal.id).unwrap()
    }

    #[tokio::test]
    async fn expense_reduces_account_balance() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);

        fixture
            .coordinator
            .create_transaction(Transaction::build(
                30.0,
                TransactionType::Expense,
                account.id,
                fixture.user,
            ))
            .expect("Could not create transaction");
        fixture.outbox.flush().await;

        assert_eq!(fixture.accounts.get(account.id).unwrap().balance, 70.0);
    }

    #[tokio::test]
    async fn contribution_completes_goal() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 1000.0);
        let goal = create_goal(&mut fixture, 500.0, 450.0);
        assert_eq!(goal.status, GoalStatus::InProgress);

        fixture
            .coordinator
            .create_transaction(
                Transaction::build(
                    60.0,
                    TransactionType::Contribution,
                    account.id,
                    fixture.user,
                )
                .goal(Some(goal.id)),
            )
            .expect("Could not create contribution");
        fixture.outbox.flush().await;

        let goal = fixture.goals.get(goal.id).unwrap();
        assert_eq!(goal.current_amount, 510.0);
        assert_eq!(goal.status, GoalStatus::Completed);
        // The contribution moved money out of the account.
        assert_eq!(fixture.accounts.get(account.id).unwrap().balance, 940.0);
    }

    #[tokio::test]
    async fn deleting_contribution_reverts_goal() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 1000.0);
        let goal = create_goal(&mut fixture, 500.0, 450.0);
        let transaction = fixture
            .coordinator
            .create_transaction(
                Transaction::build(
                    60.0,
                    TransactionType::Contribution,
                    account.id,
                    fixture.user,
                )
                .goal(Some(goal.id)),
            )
            .unwrap();
        fixture.outbox.flush().await;

        fixture
            .coordinator
            .delete_transaction(transaction.id, fixture.user)
            .expect("Could not delete transaction");
        fixture.outbox.flush().await;

        let goal = fixture.goals.get(goal.id).unwrap();
        assert_eq!(goal.current_amount, 450.0);
        assert_eq!(goal.status, GoalStatus::InProgress);
    }

    #[tokio::test]
    async fn create_then_delete_returns_balance_to_start() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 250.0);

        let transaction = fixture
            .coordinator
            .create_transaction(Transaction::build(
                75.5,
                TransactionType::Income,
                account.id,
                fixture.user,
            ))
            .unwrap();
        fixture.outbox.flush().await;
        assert_eq!(fixture.accounts.get(account.id).unwrap().balance, 325.5);

        fixture
            .coordinator
            .delete_transaction(transaction.id, fixture.user)
            .unwrap();
        fixture.outbox.flush().await;

        assert_eq!(fixture.accounts.get(account.id).unwrap().balance, 250.0);
        assert_eq!(
            fixture.transactions.get(transaction.id),
            Err(Error::TransactionNotFound)
        );
    }

    #[tokio::test]
    async fn category_kind_mismatch_writes_nothing() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);
        let category = fixture
            .categories
            .create(NewCategory {
                user_id: fixture.user,
                name: "Salary".to_owned(),
                kind: CategoryKind::Income,
            })
            .unwrap();

        let result = fixture.coordinator.create_transaction(
            Transaction::build(30.0, TransactionType::Expense, account.id, fixture.user)
                .category(Some(category.id)),
        );
        fixture.outbox.flush().await;

        assert_eq!(
            result,
            Err(Error::CategoryKindMismatch {
                category: CategoryKind::Income,
                transaction: TransactionType::Expense,
            })
        );
        // No ledger write, no balance change, no audit entry.
        assert!(
            fixture
                .transactions
                .get_query(Default::default())
                .unwrap()
                .is_empty()
        );
        assert_eq!(fixture.accounts.get(account.id).unwrap().balance, 100.0);
        assert!(fixture.audit.recent(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);

        for amount in [0.0, -5.0, f64::NAN] {
            let result = fixture.coordinator.create_transaction(Transaction::build(
                amount,
                TransactionType::Expense,
                account.id,
                fixture.user,
            ));

            assert!(
                matches!(result, Err(Error::InvalidAmount(_))),
                "amount {amount} should have been rejected, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn rejects_inactive_account() {
        let mut fixture = get_fixture();
        let account =
            create_account_with_status(&mut fixture, 100.0, AccountStatus::Inactive);

        let result = fixture.coordinator.create_transaction(Transaction::build(
            10.0,
            TransactionType::Expense,
            account.id,
            fixture.user,
        ));

        assert_eq!(result, Err(Error::AccountNotActive(account.id)));
    }

    #[tokio::test]
    async fn rejects_goal_on_non_contribution() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);
        let goal = create_goal(&mut fixture, 500.0, 0.0);

        let result = fixture.coordinator.create_transaction(
            Transaction::build(10.0, TransactionType::Expense, account.id, fixture.user)
                .goal(Some(goal.id)),
        );

        assert_eq!(result, Err(Error::GoalRequiresContribution));
    }

    #[tokio::test]
    async fn hides_other_users_account() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);

        let result = fixture.coordinator.create_transaction(Transaction::build(
            10.0,
            TransactionType::Expense,
            account.id,
            UserID::new(2),
        ));

        assert_eq!(result, Err(Error::AccountNotFound));
    }

    #[tokio::test]
    async fn hides_other_users_transaction_on_delete() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);
        let transaction = fixture
            .coordinator
            .create_transaction(Transaction::build(
                10.0,
                TransactionType::Expense,
                account.id,
                fixture.user,
            ))
            .unwrap();

        let result = fixture
            .coordinator
            .delete_transaction(transaction.id, UserID::new(2));

        assert_eq!(result, Err(Error::TransactionNotFound));
        assert!(fixture.transactions.get(transaction.id).is_ok());
    }

    #[tokio::test]
    async fn mutations_write_audit_history() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);

        let transaction = fixture
            .coordinator
            .create_transaction(
                Transaction::build(30.0, TransactionType::Expense, account.id, fixture.user)
                    .note("Petrol"),
            )
            .unwrap();
        fixture.outbox.flush().await;
        fixture
            .coordinator
            .delete_transaction(transaction.id, fixture.user)
            .unwrap();
        fixture.outbox.flush().await;

        let history = fixture.audit.for_transaction(transaction.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Created);
        assert_eq!(history[1].action, AuditAction::Deleted);
        assert_eq!(history[0].note, "Petrol");
    }

    #[tokio::test]
    async fn mutations_publish_transaction_events() {
        let mut fixture = get_fixture();
        let account = create_account(&mut fixture, 100.0);
        let mut subscription = fixture
            .notifier
            .subscribe(EntityKind::Transaction, ChangeFilter::default());

        let transaction = fixture
            .coordinator
            .create_transaction(Transaction::build(
                10.0,
                TransactionType::Expense,
                account.id,
                fixture.user,
            ))
            .unwrap();
        fixture
            .coordinator
            .delete_transaction(transaction.id, fixture.user)
            .unwrap();

        let created = subscription.recv().await.unwrap();
        let deleted = subscription.recv().await.unwrap();
        assert_eq!(
            (created.change, created.entity_id),
            (ChangeKind::Created, transaction.id)
        );
        assert_eq!(
            (deleted.change, deleted.entity_id),
            (ChangeKind::Deleted, transaction.id)
        );
    }
}
