//! Applies contribution deltas to savings goal progress.

use crate::{
    Error, ErrorKind,
    models::{DatabaseID, Goal, GoalStatus},
    stores::GoalStore,
};

/// Adjusts goal progress by contribution amounts and derives the goal status.
///
/// Uses the same atomic-then-fallback strategy as the balance reconciler.
/// Progress is clamped at zero rather than erroring when a deletion would
/// push it negative; the fallback path logs a warning when the clamp actually
/// truncates so a double-counted deletion is visible in the logs.
#[derive(Debug, Clone)]
pub struct GoalProgressUpdater<S> {
    store: S,
}

impl<S: GoalStore> GoalProgressUpdater<S> {
    /// Create an updater over the given goal store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Add `delta` to the progress of goal `goal_id`, clamped at zero, and
    /// re-derive its status. Returns the updated goal.
    ///
    /// The status flips to completed when progress reaches the target and
    /// back to in-progress when it falls below, e.g. after a contribution is
    /// deleted.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::GoalNotFound] if `goal_id` does not refer to a valid goal,
    /// - or a persistence error if both update paths fail.
    pub fn adjust(&mut self, goal_id: DatabaseID, delta: f64) -> Result<Goal, Error> {
        match self.store.increment_progress(goal_id, delta) {
            Ok(goal) => Ok(goal),
            Err(error) if error.kind() == ErrorKind::Persistence => {
                tracing::warn!(
                    goal_id,
                    "atomic progress update failed, using read-modify-write fallback: {error}"
                );

                let goal = self.store.get(goal_id)?;
                let unclamped = goal.current_amount + delta;
                let current_amount = unclamped.max(0.0);
                if unclamped < 0.0 {
                    tracing::warn!(
                        goal_id,
                        unclamped,
                        "goal progress clamped at zero; the ledger may have been double-adjusted"
                    );
                }

                let status = GoalStatus::derive(current_amount, goal.target_amount);
                self.store.set_progress(goal_id, current_amount, status)?;

                Ok(Goal {
                    current_amount,
                    status,
                    ..goal
                })
            }
            Err(error) => Err(error),
        }
    }
}
