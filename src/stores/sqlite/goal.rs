//! Implements a SQLite backed goal store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::MapRow,
    models::{DatabaseID, Goal, GoalStatus, NewGoal},
    stores::GoalStore,
};

/// Stores savings goals in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteGoalStore {
    connection: Arc<Mutex<Connection>>,
}

const COLUMNS: &str = "id, user_id, name, current_amount, target_amount, status";

impl SQLiteGoalStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl GoalStore for SQLiteGoalStore {
    /// Create a new goal in the database with zero progress.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn create(&mut self, goal: NewGoal) -> Result<Goal, Error> {
        let connection = self.connection.lock().map_err(|_| Error::DatabaseLock)?;

        let goal = connection
            .prepare(&format!(
                "INSERT INTO goal (user_id, name, current_amount, target_amount, status)
                 VALUES (?1, ?2, 0, ?3, ?4)
                 RETURNING {COLUMNS}"
            ))?
            .query_row(
                (
                    goal.user_id.as_i64(),
                    goal.name,
                    goal.target_amount,
                    GoalStatus::InProgress.as_str(),
                ),
                Goal::map_row,
            )?;

        Ok(goal)
    }

    /// Retrieve a goal in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::GoalNotFound] if `id` does not refer to a valid goal,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get(&self, id: DatabaseID) -> Result<Goal, Error> {
        let goal = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare(&format!("SELECT {COLUMNS} FROM goal WHERE id = :id"))?
            .query_row(&[(":id", &id)], Goal::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::GoalNotFound,
                error => error.into(),
            })?;

        Ok(goal)
    }

    /// Add `delta` to the goal's progress, clamp at zero, and derive the
    /// status, all in one SQL statement. Returns the updated goal.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::GoalNotFound] if `id` does not refer to a valid goal,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn increment_progress(&mut self, id: DatabaseID, delta: f64) -> Result<Goal, Error> {
        let goal = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare(&format!(
                "UPDATE goal
                 SET current_amount = MAX(0.0, current_amount + ?1),
                     status = CASE
                         WHEN MAX(0.0, current_amount + ?1) >= target_amount THEN 'completed'
                         ELSE 'in_progress'
                     END
                 WHERE id = ?2
                 RETURNING {COLUMNS}"
            ))?
            .query_row((delta, id), Goal::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::GoalNotFound,
                error => error.into(),
            })?;

        Ok(goal)
    }

    /// Overwrite the goal's progress and status.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::GoalNotFound] if `id` does not refer to a valid goal,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn set_progress(
        &mut self,
        id: DatabaseID,
        current_amount: f64,
        status: GoalStatus,
    ) -> Result<(), Error> {
        let rows_affected = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .execute(
                "UPDATE goal SET current_amount = ?1, status = ?2 WHERE id = ?3",
                (current_amount, status.as_str(), id),
            )?;

        if rows_affected == 0 {
            return Err(Error::GoalNotFound);
        }

        Ok(())
    }
}
