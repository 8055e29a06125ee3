//! Persistence of the authentication token.

use std::path::Path;
use std::sync::Mutex;

use penguin_shared::constants::TOKEN_STORAGE_KEY;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Durable home of the authentication token.
///
/// Implementations are called from the blocking thread pool, so they may do
/// synchronous I/O.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token kept in the `kv` table of a SQLite database.
pub struct SqliteTokenStore {
    db: Mutex<Database>,
}

impl SqliteTokenStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open the database under `dir`, or the platform data dir when `None`.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let db = match dir {
            Some(dir) => Database::open_in(dir)?,
            None => Database::open_default()?,
        };
        Ok(Self::new(db))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&guard)
    }
}

impl TokenStore for SqliteTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let token = self.with_db(|db| db.get_value(TOKEN_STORAGE_KEY))?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        self.with_db(|db| db.set_value(TOKEN_STORAGE_KEY, token))
    }

    fn clear(&self) -> Result<()> {
        self.with_db(|db| db.delete_value(TOKEN_STORAGE_KEY).map(|_| ()))
    }
}

/// Process-local token store.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let guard = self.token.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut guard = self.token.lock().map_err(|_| StoreError::LockPoisoned)?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.token.lock().map_err(|_| StoreError::LockPoisoned)?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_token_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SqliteTokenStore::open(Some(dir.path())).unwrap();
            assert_eq!(store.load().unwrap(), None);
            store.save("jwt-1").unwrap();
        }

        let store = SqliteTokenStore::open(Some(dir.path())).unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("jwt-1"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn sqlite_empty_token_reads_as_absent() {
        let store = SqliteTokenStore::new(Database::open_in_memory().unwrap());
        store.save("").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn memory_store() {
        let store = MemoryTokenStore::with_token("t");
        assert_eq!(store.load().unwrap().as_deref(), Some("t"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
