//! Rebuilds derived aggregates from the ledger.
//!
//! The ledger is the source of truth, so any aggregate can be recomputed from
//! scratch by folding over the transactions that reference it. This is the
//! wholesale repair path for aggregates that have drifted, e.g. after
//! post-commit work was lost to a crash or left on the outbox's dead-letter
//! list.

use crate::{
    Error,
    models::{DatabaseID, Goal, GoalStatus},
    stores::{AccountStore, GoalStore, TransactionQuery, TransactionStore},
};

/// Recompute the balance of account `account_id` from the ledger and
/// overwrite the stored value. Returns the rebuilt balance.
///
/// The balance is the account's initial balance plus the signed effect of
/// every transaction referencing the account.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if `account_id` does not refer to a valid
///   account,
/// - or a persistence error if the ledger read or the balance write fails.
pub fn rebuild_account_balance<T, A>(
    transactions: &T,
    accounts: &mut A,
    account_id: DatabaseID,
) -> Result<f64, Error>
where
    T: TransactionStore,
    A: AccountStore,
{
    let account = accounts.get(account_id)?;
    let entries = transactions.get_query(TransactionQuery {
        account_id: Some(account_id),
        ..Default::default()
    })?;

    let balance = account.initial_balance
        + entries
            .iter()
            .map(|transaction| transaction.signed_amount())
            .sum::<f64>();

    if balance != account.balance {
        tracing::warn!(
            account_id,
            stored = account.balance,
            rebuilt = balance,
            "account balance had drifted from the ledger"
        );
    }
    accounts.set_balance(account_id, balance)?;

    Ok(balance)
}

/// Recompute the progress of goal `goal_id` from the ledger, overwrite the
/// stored value, and re-derive the goal's status. Returns the rebuilt goal.
///
/// Progress is the sum of the amounts of every contribution directed at the
/// goal, clamped at zero.
///
/// # Errors
/// This function will return a:
/// - [Error::GoalNotFound] if `goal_id` does not refer to a valid goal,
/// - or a persistence error if the ledger read or the progress write fails.
pub fn rebuild_goal_progress<T, G>(
    transactions: &T,
    goals: &mut G,
    goal_id: DatabaseID,
) -> Result<Goal, Error>
where
    T: TransactionStore,
    G: GoalStore,
{
    let goal = goals.get(goal_id)?;
    let contributions = transactions.get_query(TransactionQuery {
        goal_id: Some(goal_id),
        ..Default::default()
    })?;

    let current_amount = contributions
        .iter()
        .map(|transaction| transaction.amount)
        .sum::<f64>()
        .max(0.0);
    let status = GoalStatus::derive(current_amount, goal.target_amount);

    if current_amount != goal.current_amount {
        tracing::warn!(
            goal_id,
            stored = goal.current_amount,
            rebuilt = current_amount,
            "goal progress had drifted from the ledger"
        );
    }
    goals.set_progress(goal_id, current_amount, status)?;

    Ok(Goal {
        current_amount,
        status,
        ..goal
    })
}
