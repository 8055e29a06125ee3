use thiserror::Error;

use penguin_shared::ChatId;
use penguin_store::StoreError;

use crate::api::ApiError;
use crate::route::Route;

/// Every failure a user-facing operation can report.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected locally; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Login rejected by the user service. Unlike an expired token this
    /// does not end a session or move the user anywhere.
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Chat {0} is not in your chat list")]
    UnknownChat(ChatId),

    #[error("No chat is open")]
    NoActiveChat,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Push channel error: {0}")]
    Push(String),
}

impl ClientError {
    /// Screen the UI must move to instead of rendering, if any.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Unauthenticated | Self::UnknownChat(_) => Some(Route::Entry),
            Self::Api(ApiError::Unauthorized(_)) => Some(Route::Entry),
            Self::NoActiveChat => Some(Route::ChatList),
            _ => None,
        }
    }

    /// Whether the server rejected the stored token.
    ///
    /// A local [`Unauthenticated`](Self::Unauthenticated) only redirects: the
    /// persisted token may simply not be loaded yet.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized(_)))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
