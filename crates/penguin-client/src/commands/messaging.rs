use tracing::{debug, info};

use penguin_shared::ChatId;

use super::surface;
use crate::error::{ClientError, Result};
use crate::route;
use crate::state::AppState;
use crate::sync::SyncHandle;

/// Text input of the message screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    text: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing but whitespace; no request, input untouched.
    Skipped,
    Sent,
}

/// Send the composer's text to the current chat.
///
/// The text goes out exactly as typed. Once a request has been attempted the
/// input is cleared whether or not it succeeded. The message is not echoed
/// locally; it shows up through the sync loop, which is asked to refresh.
pub async fn send_message(
    state: &AppState,
    composer: &mut Composer,
    sync: Option<&SyncHandle>,
) -> Result<SendOutcome> {
    if composer.is_blank() {
        debug!("Blank message, not sending");
        return Ok(SendOutcome::Skipped);
    }

    let target = route::guard_protected(&state.session).and_then(|token| {
        let chat = state
            .session
            .current_chat()
            .ok_or(ClientError::NoActiveChat)?;
        Ok((token, chat.id))
    });
    let (token, chat_id) = match target {
        Ok(target) => target,
        Err(e) => return Err(surface(state, "send_message", e)),
    };

    let text = composer.take();
    match state.api.send_message(&token, chat_id, &text).await {
        Ok(()) => {
            info!(chat = %chat_id, len = text.len(), "Message sent");
            nudge(sync, chat_id);
            Ok(SendOutcome::Sent)
        }
        Err(e) => Err(surface(state, "send_message", e.into())),
    }
}

fn nudge(sync: Option<&SyncHandle>, chat_id: ChatId) {
    if let Some(handle) = sync.filter(|h| h.chat_id() == chat_id) {
        handle.refresh_now();
    }
}
