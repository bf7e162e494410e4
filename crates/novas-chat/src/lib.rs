//! Chat sessions for the novas chat client.
//!
//! [`ChatSession`] is the per-chat state machine (configuration, create or
//! fetch, history, single-flight sends, rewrite). [`ChatClient`] drives it
//! against a [`ChatApi`] and a [`ChatTransport`]; the HTTP implementations talk
//! to the novas backend and decode its UI message stream.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use novas_chat::{
//!     ChatClient, ClientConfig, HttpChatApi, HttpChatTransport, MemorySettingsStore,
//!     PendingChatStore,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), novas_chat::ChatError> {
//! let config = ClientConfig::from_env()?;
//! let mut client = ChatClient::new(
//!     "chat-1",
//!     &config,
//!     Arc::new(HttpChatApi::new(config.clone())?),
//!     Arc::new(HttpChatTransport::new(&config)?),
//!     Arc::new(MemorySettingsStore::new()),
//!     PendingChatStore::new(),
//! );
//! client.initialize().await?;
//! client.send("What's the weather in Oslo?").await?;
//! println!("{}", client.session().title());
//! # Ok(())
//! # }
//! ```

/// REST endpoints for chats, history and backend config.
pub mod api;
/// Async session driver and cancellation handle.
pub mod client;
/// Connection config and local client flags.
pub mod config;
/// Error and notification types.
pub mod errors;
/// Chats staged before they exist on the backend.
pub mod pending;
/// Per-chat state machine.
pub mod session;
/// UI message stream protocol.
pub mod stream;

pub use api::{ChatApi, ChatOptions, ChatUpdate, CreateChatRequest, HttpChatApi, Page};
pub use client::{AbortHandle, ChatClient};
pub use config::{ClientConfig, ClientSettings, MemorySettingsStore, SettingsStore};
pub use errors::{ChatError, Notification, NotificationLevel, StreamFailure};
pub use pending::{PendingChat, PendingChatStore};
pub use session::{ChatSession, FailureReason, InitStep, SessionPhase};
pub use stream::{
    ChatStreamRequest, ChatTransport, ChunkEffect, ChunkStream, HttpChatTransport,
    MessageAccumulator, UiStreamChunk,
};
