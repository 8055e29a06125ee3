//! Screens and the guards that decide whether one may be shown.
//!
//! Guards only consult the [`SessionStore`]; they never touch the network,
//! so a logged-out user is redirected before any authenticated call.

use penguin_shared::protocol::Chat;
use penguin_shared::ChatId;

use crate::error::{ClientError, Result};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Unauthenticated landing screen (sign-up).
    Entry,
    Login,
    ChatList,
    NewChat,
    Chat(ChatId),
    Participants(ChatId),
}

impl Route {
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Entry | Self::Login)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "/"),
            Self::Login => write!(f, "/login"),
            Self::ChatList => write!(f, "/chats"),
            Self::NewChat => write!(f, "/chats/new"),
            Self::Chat(id) => write!(f, "/chats/{id}"),
            Self::Participants(id) => write!(f, "/chats/participants/{id}"),
        }
    }
}

/// Gate for every screen that needs a token. Returns the token.
pub fn guard_protected(session: &SessionStore) -> Result<String> {
    session.require_token()
}

/// Gate for the message screen: a token and a chat the user belongs to.
pub fn guard_chat(session: &SessionStore, chat_id: ChatId) -> Result<Chat> {
    guard_protected(session)?;
    session
        .find_chat(chat_id)
        .ok_or(ClientError::UnknownChat(chat_id))
}
