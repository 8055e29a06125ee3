//! JSON wire format of the user service, the chat service and the push
//! channel.
//!
//! The backend is not consistent about payload shapes (Go nil slices arrive
//! as `null`, the empty chat list is an object, member rows carry untagged
//! field names), so several types here accept more than one layout and
//! normalise to a single canonical one.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProtocolError;
use crate::types::{ChatId, MessageId, UserId};

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// A chat the current user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub chat_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

/// A chat message. Immutable once the server has assigned its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    pub message_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

/// A chat membership record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    #[serde(alias = "UserID")]
    pub user_id: UserId,
    #[serde(alias = "Username")]
    pub username: String,
}

/// Owner plus participants of one chat, as returned by `GET /getChatMembers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMembers {
    pub owner_id: UserId,
    #[serde(default)]
    pub owner_username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub participants: Vec<Participant>,
}

impl ChatMembers {
    pub fn is_owner(&self, participant: &Participant) -> bool {
        participant.user_id == self.owner_id
    }

    /// The owner's name, taken from the participant rows when the
    /// response left `owner_username` out.
    pub fn owner_name(&self) -> &str {
        if !self.owner_username.is_empty() {
            return &self.owner_username;
        }
        self.participants
            .iter()
            .find(|p| self.is_owner(p))
            .map_or("", |p| p.username.as_str())
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.owner_username == username || self.participants.iter().any(|p| p.username == username)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateChatRequest {
    pub chat_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub message_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddMemberRequest {
    pub username: String,
    pub chat_id: ChatId,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
}

/// `{"message": "..."}` acknowledgement envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
}

/// `{"error": "..."}` failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Payload of `GET /accessChat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatList {
    Chats(Vec<Chat>),
    /// Returned instead of `[]` when the user has no chats.
    Notice(ApiMessage),
    Null(()),
}

impl ChatList {
    pub fn into_chats(self) -> Vec<Chat> {
        match self {
            Self::Chats(chats) => chats,
            Self::Notice(_) | Self::Null(()) => Vec::new(),
        }
    }
}

/// Payload of `GET /getMessagesGroupedByChat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupedMessages {
    /// One array per chat.
    Nested(Vec<Vec<Message>>),
    Flat(Vec<Message>),
    /// Object keyed by the decimal chat id.
    ByChat(BTreeMap<String, Option<Vec<Message>>>),
    Null(()),
}

impl GroupedMessages {
    /// Every message in the payload, in payload order.
    pub fn into_flat(self) -> Vec<Message> {
        match self {
            Self::Nested(groups) => groups.into_iter().flatten().collect(),
            Self::Flat(messages) => messages,
            Self::ByChat(groups) => groups.into_values().flatten().flatten().collect(),
            Self::Null(()) => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Push channel
// ---------------------------------------------------------------------------

/// Notification that something happened in a chat, without the message itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatHint {
    pub chat_id: ChatId,
    #[serde(default)]
    pub text: String,
}

/// A text frame received on the websocket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PushFrame {
    /// A complete, server-assigned message.
    Message(Message),
    /// A broadcast without a message id; the receiver has to refetch.
    ChatHint(ChatHint),
}

impl PushFrame {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        serde_json::from_value(value).map_err(|_| ProtocolError::UnknownFrame(truncate(text)))
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Message(m) => m.chat_id,
            Self::ChatHint(h) => h.chat_id,
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(120).collect()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
