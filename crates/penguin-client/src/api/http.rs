use async_trait::async_trait;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use penguin_shared::constants::CHAT_ID_HEADER;
use penguin_shared::protocol::{
    AddMemberRequest, ApiErrorBody, ApiMessage, Chat, ChatList, ChatMembers, CreateChatRequest,
    GroupedMessages, LoginRequest, LoginResponse, Message, RegisterRequest, SendMessageRequest,
};
use penguin_shared::ChatId;

use super::{ApiError, ApiResult, ChatApi};
use crate::config::ClientConfig;

/// [`ChatApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    user_service_url: String,
    chat_service_url: String,
}

impl HttpChatApi {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            user_service_url: config.user_service_url.trim_end_matches('/').to_string(),
            chat_service_url: config.chat_service_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/{path}", self.user_service_url)
    }

    fn chat_url(&self, path: &str) -> String {
        format!("{}/{path}", self.chat_service_url)
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn register(&self, request: &RegisterRequest) -> ApiResult<ApiMessage> {
        let resp = self
            .client
            .post(self.user_url("register"))
            .json(request)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| ApiMessage {
            message: body.trim().to_string(),
        }))
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let resp = self
            .client
            .post(self.user_url("login"))
            .json(request)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let cookie_token = token_from_cookies(resp.headers());
        let body = resp.text().await?;

        if let Ok(parsed) = serde_json::from_str::<LoginResponse>(&body) {
            if !parsed.token.is_empty() {
                return Ok(parsed);
            }
        }

        match cookie_token {
            Some(token) => {
                debug!("Login token taken from Set-Cookie");
                Ok(LoginResponse {
                    message: body.trim().to_string(),
                    token,
                })
            }
            None => Err(ApiError::Decode("login response carried no token".into())),
        }
    }

    async fn list_chats(&self, token: &str) -> ApiResult<Vec<Chat>> {
        let resp = self
            .authed(self.client.get(self.chat_url("accessChat")), token)
            .send()
            .await?;
        let list: ChatList = read_json(resp).await?;
        Ok(list.into_chats())
    }

    async fn create_chat(&self, token: &str, chat_name: &str) -> ApiResult<ApiMessage> {
        let resp = self
            .authed(self.client.post(self.chat_url("createChat")), token)
            .json(&CreateChatRequest {
                chat_name: chat_name.to_string(),
            })
            .send()
            .await?;
        read_ack(resp).await
    }

    async fn all_messages(&self, token: &str) -> ApiResult<Vec<Message>> {
        let resp = self
            .authed(
                self.client.get(self.chat_url("getMessagesGroupedByChat")),
                token,
            )
            .send()
            .await?;
        let grouped: GroupedMessages = read_json(resp).await?;
        Ok(grouped.into_flat())
    }

    async fn send_message(&self, token: &str, chat_id: ChatId, text: &str) -> ApiResult<()> {
        let resp = self
            .authed(self.client.post(self.chat_url("sendMessage")), token)
            .json(&SendMessageRequest {
                chat_id,
                message_text: text.to_string(),
            })
            .send()
            .await?;
        read_ack(resp).await.map(|_| ())
    }

    async fn chat_members(&self, token: &str, chat_id: ChatId) -> ApiResult<ChatMembers> {
        let resp = self
            .authed(self.client.get(self.chat_url("getChatMembers")), token)
            .header(CHAT_ID_HEADER, chat_id.to_string())
            .send()
            .await?;
        read_json(resp).await
    }

    async fn add_member(&self, token: &str, chat_id: ChatId, username: &str) -> ApiResult<()> {
        let resp = self
            .authed(self.client.post(self.chat_url("addUserToChat")), token)
            .json(&AddMemberRequest {
                username: username.to_string(),
                chat_id,
            })
            .send()
            .await?;
        read_ack(resp).await.map(|_| ())
    }

    async fn all_users(&self, token: &str) -> ApiResult<Vec<String>> {
        let resp = self
            .authed(self.client.get(self.chat_url("getAllUsers")), token)
            .send()
            .await?;
        let users: Option<Vec<String>> = read_json(resp).await?;
        Ok(users.unwrap_or_default())
    }
}

/// Turn a non-2xx response into an [`ApiError`].
async fn check_status(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body, status);

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(message));
    }
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let resp = check_status(resp).await?;
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Acknowledgements are JSON on the chat service but not guaranteed to be.
async fn read_ack(resp: Response) -> ApiResult<ApiMessage> {
    let resp = check_status(resp).await?;
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body).unwrap_or_else(|_| ApiMessage {
        message: body.trim().to_string(),
    }))
}

/// `{"error": ..}`, then `{"message": ..}`, then the trimmed text body.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.error;
    }
    if let Ok(parsed) = serde_json::from_str::<ApiMessage>(body) {
        if !parsed.message.is_empty() {
            return parsed.message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            let value = value.trim();
            (name.trim() == "token" && !value.is_empty()).then(|| value.to_string())
        })
}
