//! Scriptable in-process [`ChatApi`] for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use penguin_shared::protocol::{
    ApiMessage, Chat, ChatMembers, LoginRequest, LoginResponse, Message, Participant,
    RegisterRequest,
};
use penguin_shared::{ChatId, MessageId, UserId};

use crate::api::{ApiError, ApiResult, ChatApi};

pub(crate) fn message(id: i64, chat: i64) -> Message {
    Message {
        message_id: MessageId(id),
        chat_id: ChatId(chat),
        user_id: UserId(1),
        username: "ana".into(),
        message_text: format!("message {id}"),
        sent_at: None,
    }
}

pub(crate) fn chat(id: i64) -> Chat {
    Chat {
        id: ChatId(id),
        chat_name: format!("chat-{id}"),
        owner_id: Some(UserId(1)),
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    /// Every call as `"<method> <token>"` (token `-` for anonymous calls).
    pub calls: Mutex<Vec<String>>,
    /// Responses for `all_messages`, consumed front to back.
    pub message_responses: Mutex<VecDeque<ApiResult<Vec<Message>>>>,
    /// Served by `all_messages` once the queue is empty.
    pub messages: Mutex<Vec<Message>>,
    /// When set, each `all_messages` call waits for one permit.
    pub fetch_gate: Option<Arc<Semaphore>>,
    pub chats: Mutex<Vec<Chat>>,
    pub users: Mutex<Vec<String>>,
    pub members: Mutex<Vec<Participant>>,
    pub sent: Mutex<Vec<(ChatId, String)>>,
    pub send_error: Mutex<Option<ApiError>>,
    pub login_error: Mutex<Option<ApiError>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let api = Self {
            fetch_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (api, gate)
    }

    pub fn push_response(&self, response: ApiResult<Vec<Message>>) {
        self.message_responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    fn record(&self, method: &str, token: Option<&str>) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{method} {}", token.unwrap_or("-")));
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn register(&self, _request: &RegisterRequest) -> ApiResult<ApiMessage> {
        self.record("register", None);
        Ok(ApiMessage {
            message: "User created successfully!".into(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.record("login", None);
        if let Some(e) = self.login_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(LoginResponse {
            message: "Login successful".into(),
            token: format!("jwt-{}", request.username),
        })
    }

    async fn list_chats(&self, token: &str) -> ApiResult<Vec<Chat>> {
        self.record("list_chats", Some(token));
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn create_chat(&self, token: &str, chat_name: &str) -> ApiResult<ApiMessage> {
        self.record("create_chat", Some(token));
        let mut chats = self.chats.lock().unwrap();
        let id = chats.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        chats.push(Chat {
            id: ChatId(id),
            chat_name: chat_name.to_string(),
            owner_id: Some(UserId(1)),
        });
        Ok(ApiMessage {
            message: "chat created successfully".into(),
        })
    }

    async fn all_messages(&self, token: &str) -> ApiResult<Vec<Message>> {
        self.record("all_messages", Some(token));
        if let Some(gate) = &self.fetch_gate {
            gate.acquire()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .forget();
        }
        if let Some(response) = self.message_responses.lock().unwrap().pop_front() {
            return response;
        }
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn send_message(&self, token: &str, chat_id: ChatId, text: &str) -> ApiResult<()> {
        self.record("send_message", Some(token));
        if let Some(e) = self.send_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn chat_members(&self, token: &str, _chat_id: ChatId) -> ApiResult<ChatMembers> {
        self.record("chat_members", Some(token));
        Ok(ChatMembers {
            owner_id: UserId(1),
            owner_username: "ana".into(),
            participants: self.members.lock().unwrap().clone(),
        })
    }

    async fn add_member(&self, token: &str, _chat_id: ChatId, username: &str) -> ApiResult<()> {
        self.record("add_member", Some(token));
        let mut members = self.members.lock().unwrap();
        let id = members.len() as i64 + 10;
        members.push(Participant {
            user_id: UserId(id),
            username: username.to_string(),
        });
        Ok(())
    }

    async fn all_users(&self, token: &str) -> ApiResult<Vec<String>> {
        self.record("all_users", Some(token));
        Ok(self.users.lock().unwrap().clone())
    }
}
