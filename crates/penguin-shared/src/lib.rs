//! # penguin-shared
//!
//! Types shared by every Penguin crate: identifier newtypes, the JSON wire
//! format of the chat and user services, and the push channel frames.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use types::{ChatId, MessageId, UserId};
