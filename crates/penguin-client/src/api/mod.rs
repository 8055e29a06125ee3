//! Boundary with the user and chat services.
//!
//! [`ChatApi`] is the seam the rest of the client talks to. [`HttpChatApi`]
//! is the production implementation; tests substitute their own.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use penguin_shared::protocol::{
    ApiMessage, Chat, ChatMembers, LoginRequest, LoginResponse, Message, RegisterRequest,
};
use penguin_shared::ChatId;

pub use http::HttpChatApi;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing, expired or rejected token (HTTP 401).
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Server responded {status}: {message}")]
    Server { status: u16, message: String },

    /// The request never produced a response (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One method per backend endpoint. Authenticated calls take the bearer
/// token explicitly; checking that one exists is the caller's job.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /register`
    async fn register(&self, request: &RegisterRequest) -> ApiResult<ApiMessage>;

    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse>;

    /// `GET /accessChat`
    async fn list_chats(&self, token: &str) -> ApiResult<Vec<Chat>>;

    /// `POST /createChat`
    async fn create_chat(&self, token: &str, chat_name: &str) -> ApiResult<ApiMessage>;

    /// `GET /getMessagesGroupedByChat`, flattened across chats.
    async fn all_messages(&self, token: &str) -> ApiResult<Vec<Message>>;

    /// `POST /sendMessage`
    async fn send_message(&self, token: &str, chat_id: ChatId, text: &str) -> ApiResult<()>;

    /// `GET /getChatMembers`
    async fn chat_members(&self, token: &str, chat_id: ChatId) -> ApiResult<ChatMembers>;

    /// `POST /addUserToChat`
    async fn add_member(&self, token: &str, chat_id: ChatId, username: &str) -> ApiResult<()>;

    /// `GET /getAllUsers`
    async fn all_users(&self, token: &str) -> ApiResult<Vec<String>>;
}
