use tracing::info;

use penguin_shared::protocol::ChatMembers;
use penguin_shared::ChatId;

use super::surface;
use crate::error::Result;
use crate::events::Notice;
use crate::route;
use crate::state::AppState;
use crate::validation::require_non_empty;

/// Participants screen mount: owner plus members of `chat_id`.
pub async fn load_participants(state: &AppState, chat_id: ChatId) -> Result<ChatMembers> {
    let result: Result<ChatMembers> = async {
        let token = route::guard_protected(&state.session)?;
        Ok(state.api.chat_members(&token, chat_id).await?)
    }
    .await;

    result.map_err(|e| surface(state, "load_participants", e))
}

/// Add `username` to `chat_id` (owner only, enforced by the server) and
/// return the refreshed membership.
pub async fn add_participant(state: &AppState, chat_id: ChatId, username: &str) -> Result<ChatMembers> {
    let result: Result<String> = async {
        let token = route::guard_protected(&state.session)?;
        let username = require_non_empty("Username", username)?;
        state.api.add_member(&token, chat_id, username).await?;
        Ok(username.to_string())
    }
    .await;

    match result {
        Ok(username) => {
            info!(chat = %chat_id, username = %username, "Participant added");
            state
                .events
                .notify(Notice::success(format!("{username} added to the chat")));
            load_participants(state, chat_id).await
        }
        Err(e) => Err(surface(state, "add_participant", e)),
    }
}

/// Users who could still be added to `chat_id`, filtered by `query`
/// (case-insensitive substring; empty matches everyone).
pub async fn available_users(state: &AppState, chat_id: ChatId, query: &str) -> Result<Vec<String>> {
    let result: Result<Vec<String>> = async {
        let token = route::guard_protected(&state.session)?;
        let users = state.api.all_users(&token).await?;
        let members = state.api.chat_members(&token, chat_id).await?;
        Ok(candidates(users, &members, query))
    }
    .await;

    result.map_err(|e| surface(state, "available_users", e))
}

fn candidates(users: Vec<String>, members: &ChatMembers, query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    users
        .into_iter()
        .filter(|u| !members.has_member(u))
        .filter(|u| query.is_empty() || u.to_lowercase().contains(&query))
        .collect()
}
