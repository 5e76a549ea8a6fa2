//! Implements a SQLite backed account store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::MapRow,
    models::{Account, DatabaseID, NewAccount},
    stores::AccountStore,
};

/// Stores accounts in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteAccountStore {
    connection: Arc<Mutex<Connection>>,
}

const COLUMNS: &str =
    "id, user_id, name, initial_balance, balance, status, is_default, currency";

impl SQLiteAccountStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl AccountStore for SQLiteAccountStore {
    /// Create a new account in the database.
    ///
    /// The balance starts equal to `initial_balance`.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is a SQL error.
    fn create(&mut self, account: NewAccount) -> Result<Account, Error> {
        let connection = self.connection.lock().map_err(|_| Error::DatabaseLock)?;

        let account = connection
            .prepare(&format!(
                "INSERT INTO account
                 (user_id, name, initial_balance, balance, status, is_default, currency)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {COLUMNS}"
            ))?
            .query_row(
                (
                    account.user_id.as_i64(),
                    account.name,
                    account.initial_balance,
                    account.initial_balance,
                    account.status.as_str(),
                    account.is_default,
                    account.currency,
                ),
                Account::map_row,
            )?;

        Ok(account)
    }

    /// Retrieve an account in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::AccountNotFound] if `id` does not refer to a valid account,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get(&self, id: DatabaseID) -> Result<Account, Error> {
        let account = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare(&format!("SELECT {COLUMNS} FROM account WHERE id = :id"))?
            .query_row(&[(":id", &id)], Account::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound,
                error => error.into(),
            })?;

        Ok(account)
    }

    /// Add `delta` to the account's balance in one SQL statement and return
    /// the new balance.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::AccountNotFound] if `id` does not refer to a valid account,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn increment_balance(&mut self, id: DatabaseID, delta: f64) -> Result<f64, Error> {
        let balance = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .prepare("UPDATE account SET balance = balance + ?1 WHERE id = ?2 RETURNING balance")?
            .query_row((delta, id), |row| row.get(0))
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound,
                error => error.into(),
            })?;

        Ok(balance)
    }

    /// Overwrite the account's balance.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::AccountNotFound] if `id` does not refer to a valid account,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn set_balance(&mut self, id: DatabaseID, balance: f64) -> Result<(), Error> {
        let rows_affected = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?
            .execute("UPDATE account SET balance = ?1 WHERE id = ?2", (balance, id))?;

        if rows_affected == 0 {
            return Err(Error::AccountNotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod sqlite_account_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        models::{AccountStatus, NewAccount, UserID},
        stores::{AccountStore, sqlite::SQLiteAccountStore},
    };

    fn get_store() -> SQLiteAccountStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SQLiteAccountStore::new(Arc::new(Mutex::new(connection)))
    }

    fn new_account() -> NewAccount {
        NewAccount {
            user_id: UserID::new(1),
            name: "Everyday".to_owned(),
            initial_balance: 100.0,
            status: AccountStatus::Active,
            is_default: true,
            currency: "NZD".to_owned(),
        }
    }

    #[test]
    fn create_starts_balance_at_initial_balance() {
        let mut store = get_store();

        let account = store.create(new_account()).expect("Could not create");

        assert_eq!(account.initial_balance, 100.0);
        assert_eq!(account.balance, 100.0);
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[test]
    fn get_fails_on_missing_account() {
        let store = get_store();

        assert_eq!(store.get(999), Err(Error::AccountNotFound));
    }

    #[test]
    fn increment_balance_returns_new_balance() {
        let mut store = get_store();
        let account = store.create(new_account()).unwrap();

        let balance = store
            .increment_balance(account.id, -30.0)
            .expect("Could not increment balance");

        assert_eq!(balance, 70.0);
        assert_eq!(store.get(account.id).unwrap().balance, 70.0);
    }

    #[test]
    fn increment_balance_fails_on_missing_account() {
        let mut store = get_store();

        assert_eq!(
            store.increment_balance(999, 1.0),
            Err(Error::AccountNotFound)
        );
    }

    #[test]
    fn set_balance_overwrites() {
        let mut store = get_store();
        let account = store.create(new_account()).unwrap();

        store.set_balance(account.id, 12.5).expect("Could not set");

        assert_eq!(store.get(account.id).unwrap().balance, 12.5);
    }

    #[test]
    fn set_balance_fails_on_missing_account() {
        let mut store = get_store();

        assert_eq!(store.set_balance(999, 1.0), Err(Error::AccountNotFound));
    }
}
