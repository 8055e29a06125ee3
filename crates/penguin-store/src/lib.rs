//! # penguin-store
//!
//! Local persistent storage for the Penguin client, backed by SQLite.
//!
//! The only state that outlives the process is the authentication token.
//! It lives in a small key-value table behind the [`TokenStore`] trait so
//! the session layer can be handed an in-memory store in tests.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod token;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use token::{MemoryTokenStore, SqliteTokenStore, TokenStore};
