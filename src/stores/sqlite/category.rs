//! Implements a SQLite backed category store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::MapRow,
    models::{Category, DatabaseID, NewCategory},
    stores::CategoryStore,
};

/// Stores categories in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCategoryStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl CategoryStore for SQLiteCategoryStore {
    /// Create a new category in the database.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn create(&mut self, category: NewCategory) -> Result<Category, Error> {
        let connection = self.connection.lock().map_err(|_| Error::DatabaseLock)?;

        let category = connection
            .prepare(
                "INSERT INTO category (user_id, name, kind)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, user_id, name, kind",
            )?
            .query_row(
                (
                    category.user_id.as_i64(),
                    category.name,
                    category.kind.as_str(),
                ),
                Category::map_row,
            )?;

        Ok(category)
    }

    /// Retrieve a category in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::CategoryNotFound] if `id` does not refer to a valid category,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get(&self, id: DatabaseID) -> Result<Category, Error> {
        let category = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare("SELECT id, user_id, name, kind FROM category WHERE id = :id")?
            .query_row(&[(":id", &id)], Category::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound,
                error => error.into(),
            })?;

        Ok(category)
    }
}
