//! User-initiated actions.
//!
//! Each sub-module groups related actions by screen. Every action returns a
//! [`Result`](crate::error::Result); failures are also reported on the
//! [`EventBus`](crate::events::EventBus) so the UI can show them without
//! inspecting the error.

pub mod auth;
pub mod chats;
pub mod messaging;
pub mod participants;

use tracing::warn;

use crate::api::ApiError;
use crate::error::ClientError;
use crate::events::Notice;
use crate::state::AppState;

/// Report a failed action and hand the error back to the caller.
///
/// A rejected token ends the session. Errors that imply a different screen
/// also emit a navigation request.
pub(crate) fn surface(state: &AppState, action: &'static str, err: ClientError) -> ClientError {
    warn!(action, error = %err, "Action failed");

    if err.is_auth_failure() {
        state.session.logout();
    }
    state.events.notify(Notice::error(notice_text(&err)));
    if let Some(route) = err.redirect() {
        state.events.navigate(route);
    }
    err
}

/// Server-provided text where there is one, otherwise the error itself.
fn notice_text(err: &ClientError) -> String {
    match err {
        ClientError::Api(ApiError::Server { message, .. })
        | ClientError::Api(ApiError::Unauthorized(message)) => message.clone(),
        other => other.to_string(),
    }
}
