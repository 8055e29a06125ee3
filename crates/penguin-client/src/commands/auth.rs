use tracing::info;

use penguin_shared::protocol::{LoginRequest, RegisterRequest};

use super::surface;
use crate::api::ApiError;
use crate::error::{ClientError, Result};
use crate::events::Notice;
use crate::route::Route;
use crate::state::AppState;
use crate::validation::{require_non_empty, validate_email};

/// Create an account. All fields are trimmed; any validation failure means
/// no request is sent.
pub async fn register(state: &AppState, username: &str, email: &str, password: &str) -> Result<()> {
    let result: Result<()> = async {
        let username = require_non_empty("Username", username)?;
        let email = require_non_empty("Email", email)?;
        let password = require_non_empty("Password", password)?;
        let email = validate_email(email)?;

        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        state.api.register(&request).await?;

        info!(username = %request.username, "Registered");
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            state.events.notify(Notice::success("Successfully registered"));
            state.events.navigate(Route::Login);
            Ok(())
        }
        Err(e) => Err(surface(state, "register", e)),
    }
}

/// Log in and store the returned token. Returns the server's greeting.
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<String> {
    let result: Result<String> = async {
        let username = require_non_empty("Username", username)?;
        let password = require_non_empty("Password", password)?;

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = state.api.login(&request).await.map_err(|e| match e {
            ApiError::Unauthorized(message) => ClientError::InvalidCredentials(message),
            other => ClientError::Api(other),
        })?;

        state.session.set_token(&response.token);
        info!(username = %request.username, "Logged in");
        Ok(response.message)
    }
    .await;

    match result {
        Ok(message) => {
            state.events.notify(Notice::success(message.clone()));
            state.events.navigate(Route::ChatList);
            Ok(message)
        }
        Err(e) => Err(surface(state, "login", e)),
    }
}

/// End the session. Open sync loops stop on their own once they see the
/// token disappear.
pub fn logout(state: &AppState) {
    state.session.logout();
    state.events.navigate(Route::Entry);
}
