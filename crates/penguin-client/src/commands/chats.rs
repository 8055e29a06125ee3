use tracing::info;

use penguin_shared::protocol::Chat;
use penguin_shared::ChatId;

use super::surface;
use crate::error::Result;
use crate::events::Notice;
use crate::route::{self, Route};
use crate::state::AppState;
use crate::validation::require_non_empty;

/// Chat-list screen mount: fetch the user's chats into the session.
///
/// Without a token this redirects and sends nothing.
pub async fn load_chats(state: &AppState) -> Result<Vec<Chat>> {
    let result: Result<Vec<Chat>> = async {
        let token = route::guard_protected(&state.session)?;
        let chats = state.api.list_chats(&token).await?;
        info!(count = chats.len(), "Chats loaded");
        state.session.set_chats(chats.clone());
        Ok(chats)
    }
    .await;

    result.map_err(|e| surface(state, "load_chats", e))
}

/// Create a chat owned by the current user and refresh the list.
pub async fn create_chat(state: &AppState, name: &str) -> Result<Vec<Chat>> {
    let result: Result<String> = async {
        let token = route::guard_protected(&state.session)?;
        let name = require_non_empty("Chat name", name)?;
        let ack = state.api.create_chat(&token, name).await?;
        info!(name, "Chat created");
        Ok(ack.message)
    }
    .await;

    match result {
        Ok(message) => {
            let message = if message.is_empty() {
                "Chat created".to_string()
            } else {
                message
            };
            state.events.notify(Notice::success(message));
            state.events.navigate(Route::ChatList);
            load_chats(state).await
        }
        Err(e) => Err(surface(state, "create_chat", e)),
    }
}

/// Message screen mount: make `chat_id` the current chat.
///
/// An id outside the cached chat list redirects to the entry screen.
pub fn open_chat(state: &AppState, chat_id: ChatId) -> Result<Chat> {
    match route::guard_chat(&state.session, chat_id) {
        Ok(chat) => {
            state.session.set_current_chat(chat.clone());
            Ok(chat)
        }
        Err(e) => Err(surface(state, "open_chat", e)),
    }
}

/// Cached chats whose name contains `query`, ignoring case.
pub fn search_chats(state: &AppState, query: &str) -> Vec<Chat> {
    let query = query.trim().to_lowercase();
    state
        .session
        .chats()
        .into_iter()
        .filter(|c| query.is_empty() || c.chat_name.to_lowercase().contains(&query))
        .collect()
}
