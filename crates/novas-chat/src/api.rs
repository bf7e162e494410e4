//! REST client for chats, message history and backend config.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use novas_parts::{Chat, ChatFile, Message};

use crate::config::ClientConfig;
use crate::errors::ChatError;

pub const DEFAULT_FOCUS_MODE: &str = "webSearch";
pub const DEFAULT_OPTIMIZATION_MODE: &str = "speed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    pub focus_mode: String,
    pub optimization_mode: String,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            focus_mode: DEFAULT_FOCUS_MODE.to_string(),
            optimization_mode: DEFAULT_OPTIMIZATION_MODE.to_string(),
        }
    }
}

/// Body of `POST /chats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub options: ChatOptions,
    pub files: Vec<ChatFile>,
}

/// Body of `PUT /chats/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_mode: Option<String>,
}

/// Page of `GET /chats/{id}/messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 100 }
    }
}

#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError>;
    /// `ChatError::NotFound` when the backend does not know `chat_id`.
    async fn get_chat(&self, chat_id: &str) -> Result<Chat, ChatError>;
    async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat, ChatError>;
    async fn update_chat(&self, chat_id: &str, update: &ChatUpdate) -> Result<Chat, ChatError>;
    async fn delete_chat(&self, chat_id: &str) -> Result<(), ChatError>;
    async fn get_messages(&self, chat_id: &str, page: Page) -> Result<Vec<Message>, ChatError>;
    async fn get_config(&self) -> Result<Value, ChatError>;
    async fn update_config(&self, config: &Value) -> Result<Value, ChatError>;
}

#[derive(Deserialize)]
struct ChatsEnvelope {
    #[serde(default)]
    chats: Vec<Chat>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChatEnvelope {
    Wrapped { chat: Chat },
    Bare(Chat),
}

impl ChatEnvelope {
    fn into_chat(self) -> Chat {
        match self {
            Self::Wrapped { chat } | Self::Bare(chat) => chat,
        }
    }
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    messages: Vec<Message>,
}

pub struct HttpChatApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpChatApi {
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build chat api client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        not_found: Option<&str>,
    ) -> Result<T, ChatError> {
        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("chat api request failed: {e}")))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND
            && let Some(chat_id) = not_found
        {
            return Err(ChatError::NotFound(chat_id.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Transport(format!("failed to read chat api response: {e}")))?;
        // Endpoints without a meaningful body (delete) still decode into `Value`.
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(body)
            .map_err(|e| ChatError::Protocol(format!("unexpected chat api response: {e}")))
    }
}

#[async_trait::async_trait]
impl ChatApi for HttpChatApi {
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError> {
        let envelope: ChatsEnvelope = self.send(self.client.get(self.config.chats_url()), None).await?;
        debug!(count = envelope.chats.len(), "listed chats");
        Ok(envelope.chats)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, ChatError> {
        let envelope: ChatEnvelope = self
            .send(self.client.get(self.config.chat_url(chat_id)), Some(chat_id))
            .await?;
        Ok(envelope.into_chat())
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat, ChatError> {
        let envelope: ChatEnvelope = self
            .send(self.client.post(self.config.chats_url()).json(request), None)
            .await?;
        let chat = envelope.into_chat();
        debug!(chat_id = %chat.id, "created chat");
        Ok(chat)
    }

    async fn update_chat(&self, chat_id: &str, update: &ChatUpdate) -> Result<Chat, ChatError> {
        let envelope: ChatEnvelope = self
            .send(self.client.put(self.config.chat_url(chat_id)).json(update), Some(chat_id))
            .await?;
        Ok(envelope.into_chat())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ChatError> {
        let _: Value = self
            .send(self.client.delete(self.config.chat_url(chat_id)), Some(chat_id))
            .await?;
        Ok(())
    }

    async fn get_messages(&self, chat_id: &str, page: Page) -> Result<Vec<Message>, ChatError> {
        let request = self
            .client
            .get(self.config.messages_url(chat_id))
            .query(&[("offset", page.offset), ("limit", page.limit)]);
        let envelope: MessagesEnvelope = self.send(request, Some(chat_id)).await?;
        debug!(chat_id, count = envelope.messages.len(), "loaded messages");
        Ok(envelope.messages)
    }

    async fn get_config(&self) -> Result<Value, ChatError> {
        self.send(self.client.get(self.config.config_url()), None).await
    }

    async fn update_config(&self, config: &Value) -> Result<Value, ChatError> {
        self.send(self.client.post(self.config.config_url()).json(config), None)
            .await
    }
}
