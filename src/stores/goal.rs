//! Defines the store for savings goals.

use crate::{
    Error,
    models::{DatabaseID, Goal, GoalStatus, NewGoal},
};

/// Handles the creation and retrieval of goals and the two write paths for
/// their derived progress.
pub trait GoalStore {
    /// Create a new goal in the store with zero progress.
    fn create(&mut self, goal: NewGoal) -> Result<Goal, Error>;

    /// Retrieve a goal from the store.
    fn get(&self, id: DatabaseID) -> Result<Goal, Error>;

    /// Add `delta` to the goal's progress in a single atomic operation,
    /// clamping the result at zero and deriving the goal's status in the same
    /// operation. Returns the updated goal.
    fn increment_progress(&mut self, id: DatabaseID, delta: f64) -> Result<Goal, Error>;

    /// Overwrite the goal's progress and status.
    ///
    /// The write half of the non-atomic fallback path; the caller computes
    /// the clamped progress and derived status itself.
    fn set_progress(
        &mut self,
        id: DatabaseID,
        current_amount: f64,
        status: GoalStatus,
    ) -> Result<(), Error>;
}
