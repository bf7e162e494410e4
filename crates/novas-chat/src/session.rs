//! Per-chat session state machine.
//!
//! [`ChatSession`] is pure: it never performs I/O. Each method consumes the
//! outcome of one step (configuration read, chat created, chunk received, ...)
//! and says what to do next. The async driver in [`crate::client`] feeds it.
//!
//! ```text
//! Uninitialized -> Configuring -> Creating ------------------------> Ready
//!                              \-> Fetching -> MessagesLoading ----> Ready
//! any step failing -> Failed(reason)       Fetching (404) -> NotFound
//! ```

use tracing::{debug, info, warn};

use novas_parts::{Chat, ChatFile, Message, Role};

use crate::api::{ChatOptions, CreateChatRequest};
use crate::config::{ClientSettings, DEFAULT_APP_NAME};
use crate::errors::{ChatError, Notification, StreamFailure};
use crate::pending::PendingChat;
use crate::stream::{ChatStreamRequest, ChunkEffect, MessageAccumulator, StreamOptions, UiStreamChunk};

const TITLE_PREFIX_CHARS: usize = 30;
const NOT_READY_MESSAGE: &str = "Cannot send message before the configuration is ready";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Local settings could not be read; sending stays blocked.
    Configuration(String),
    /// Creating, fetching or loading the chat failed.
    Initialization(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Configuring,
    Creating,
    Fetching,
    MessagesLoading,
    Ready,
    Failed(FailureReason),
    NotFound,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_) | Self::NotFound)
    }
}

/// Next I/O step of initialization.
#[derive(Debug, Clone, PartialEq)]
pub enum InitStep {
    Create(CreateChatRequest),
    Fetch(String),
    LoadMessages(String),
    Done,
}

pub struct ChatSession {
    chat_id: String,
    phase: SessionPhase,
    loading: bool,
    settings: Option<ClientSettings>,
    chat: Option<Chat>,
    messages: Vec<Message>,
    options: ChatOptions,
    files: Vec<ChatFile>,
    app_name: String,
    new_chat_created: bool,
    initial_message: Option<String>,
    in_flight: Option<InFlight>,
    notifications: Vec<Notification>,
}

struct InFlight {
    accumulator: Option<MessageAccumulator>,
    /// Index of the assistant message in `messages` once the first chunk arrived.
    index: Option<usize>,
}

impl ChatSession {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            phase: SessionPhase::Uninitialized,
            loading: false,
            settings: None,
            chat: None,
            messages: Vec::new(),
            options: ChatOptions::default(),
            files: Vec::new(),
            app_name: DEFAULT_APP_NAME.to_string(),
            new_chat_created: false,
            initial_message: None,
            in_flight: None,
            notifications: Vec::new(),
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn settings(&self) -> Option<&ClientSettings> {
        self.settings.as_ref()
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.chat.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn files(&self) -> &[ChatFile] {
        &self.files
    }

    pub fn new_chat_created(&self) -> bool {
        self.new_chat_created
    }

    /// Drains notifications raised since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        info!(chat_id = %self.chat_id, from = ?self.phase, to = ?phase, "session phase changed");
        self.phase = phase;
    }

    pub fn begin_configuring(&mut self) {
        self.set_phase(SessionPhase::Configuring);
    }

    /// Settings are in; decides between creating the chat and fetching it.
    pub fn configuration_loaded(&mut self, settings: ClientSettings, pending: Option<PendingChat>) -> InitStep {
        self.settings = Some(settings);
        if self.chat.is_some() {
            self.set_phase(SessionPhase::MessagesLoading);
            return InitStep::LoadMessages(self.chat_id.clone());
        }
        match pending {
            Some(pending) => {
                self.options = pending.options.clone();
                self.files = pending.files.clone();
                self.initial_message = pending.message.filter(|m| !m.trim().is_empty());
                self.set_phase(SessionPhase::Creating);
                InitStep::Create(CreateChatRequest {
                    chat_id: Some(self.chat_id.clone()),
                    title: None,
                    options: pending.options,
                    files: pending.files,
                })
            }
            None => {
                self.set_phase(SessionPhase::Fetching);
                InitStep::Fetch(self.chat_id.clone())
            }
        }
    }

    pub fn configuration_failed(&mut self, error: &ChatError) {
        warn!(chat_id = %self.chat_id, %error, "session configuration failed");
        self.notifications
            .push(Notification::error(format!("Failed to load configuration: {error}")));
        self.set_phase(SessionPhase::Failed(FailureReason::Configuration(error.to_string())));
    }

    /// The backend created the chat; its id replaces the client-generated one.
    pub fn chat_created(&mut self, chat: Chat) -> InitStep {
        if chat.id != self.chat_id {
            debug!(client_id = %self.chat_id, backend_id = %chat.id, "adopting backend chat id");
            self.chat_id = chat.id.clone();
        }
        self.chat = Some(chat);
        self.new_chat_created = true;
        self.set_phase(SessionPhase::Ready);
        InitStep::Done
    }

    pub fn chat_fetched(&mut self, chat: Chat) -> InitStep {
        if let Some(focus_mode) = chat.focus_mode.clone() {
            self.options.focus_mode = focus_mode;
        }
        if let Some(optimization_mode) = chat.optimization_mode.clone() {
            self.options.optimization_mode = optimization_mode;
        }
        self.files = chat.files.clone();
        self.chat = Some(chat);
        self.set_phase(SessionPhase::MessagesLoading);
        InitStep::LoadMessages(self.chat_id.clone())
    }

    pub fn messages_loaded(&mut self, messages: Vec<Message>) -> InitStep {
        self.messages = messages;
        self.set_phase(SessionPhase::Ready);
        InitStep::Done
    }

    /// Fetch or create failed. A missing chat is its own phase; everything else
    /// is reported once and not retried.
    pub fn initialization_failed(&mut self, error: &ChatError) {
        if let ChatError::NotFound(_) = error {
            self.set_phase(SessionPhase::NotFound);
            return;
        }
        warn!(chat_id = %self.chat_id, %error, "session initialization failed");
        self.notifications
            .push(Notification::error(format!("Failed to load chat: {error}")));
        self.set_phase(SessionPhase::Failed(FailureReason::Initialization(error.to_string())));
    }

    /// First message captured before the chat existed; yielded once, after the
    /// session became ready.
    pub fn take_initial_message(&mut self) -> Option<String> {
        if self.is_ready() {
            self.initial_message.take()
        } else {
            None
        }
    }

    fn config_ready(&self) -> bool {
        self.settings.is_some() && !matches!(self.phase, SessionPhase::Failed(_) | SessionPhase::NotFound)
    }

    /// `Ok(false)` when a send is already in flight (the call is a no-op).
    fn check_can_send(&mut self) -> Result<bool, ChatError> {
        if self.loading {
            debug!(chat_id = %self.chat_id, "send ignored while a response is streaming");
            return Ok(false);
        }
        if !self.config_ready() {
            self.notifications.push(Notification::error(NOT_READY_MESSAGE));
            return Err(ChatError::NotReady(NOT_READY_MESSAGE.to_string()));
        }
        Ok(true)
    }

    /// Appends the user message and returns the stream request to open.
    ///
    /// `Ok(None)` while another send is in flight; nothing changes in that case.
    pub fn begin_send(&mut self, text: &str, message_id: Option<String>) -> Result<Option<ChatStreamRequest>, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".into()));
        }
        if !self.check_can_send()? {
            return Ok(None);
        }
        Ok(Some(self.push_user_message(text, message_id)))
    }

    fn push_user_message(&mut self, text: &str, message_id: Option<String>) -> ChatStreamRequest {
        let id = message_id.unwrap_or_else(new_message_id);
        self.messages.push(Message::user_text(id, text));
        self.loading = true;
        self.in_flight = Some(InFlight {
            accumulator: None,
            index: None,
        });
        debug!(chat_id = %self.chat_id, messages = self.messages.len(), "send started");
        ChatStreamRequest {
            id: self.chat_id.clone(),
            messages: self.messages.clone(),
            options: StreamOptions {
                focus_mode: self.options.focus_mode.clone(),
                optimization_mode: self.options.optimization_mode.clone(),
                system_instructions: self
                    .settings
                    .as_ref()
                    .and_then(|settings| settings.system_instructions.clone()),
            },
        }
    }

    /// Truncates the history before the user message that produced
    /// `assistant_message_id` and resubmits that message under its own id.
    ///
    /// With more than two messages the list keeps `messages[..i - 1]`, where `i`
    /// is the assistant message's index; otherwise it is cleared. Unknown ids, a
    /// first-position message and calls during a send are no-ops.
    pub fn rewrite(&mut self, assistant_message_id: &str) -> Result<Option<ChatStreamRequest>, ChatError> {
        let Some(index) = self.messages.iter().position(|m| m.id == assistant_message_id) else {
            return Ok(None);
        };
        if index == 0 {
            return Ok(None);
        }
        if !self.check_can_send()? {
            return Ok(None);
        }
        let trigger = self.messages[index - 1].clone();
        let keep = if self.messages.len() > 2 { index - 1 } else { 0 };
        self.messages.truncate(keep);
        info!(chat_id = %self.chat_id, message_id = %trigger.id, kept = keep, "rewriting response");
        Ok(Some(self.push_user_message(&trigger.text_content(), Some(trigger.id))))
    }

    /// Folds a chunk into the in-flight assistant message, creating it on the
    /// first chunk. Chunks outside a send are ignored.
    pub fn apply_chunk(&mut self, chunk: UiStreamChunk) -> Result<ChunkEffect, StreamFailure> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            debug!(chat_id = %self.chat_id, chunk = chunk.kind(), "chunk outside of a send ignored");
            return Ok(ChunkEffect::Unchanged);
        };
        let accumulator = in_flight
            .accumulator
            .get_or_insert_with(|| MessageAccumulator::new(new_message_id()));
        let effect = accumulator.apply(chunk)?;
        let message = accumulator.message().clone();
        match in_flight.index {
            Some(index) => self.messages[index] = message,
            None => {
                self.messages.push(message);
                in_flight.index = Some(self.messages.len() - 1);
            }
        }
        Ok(effect)
    }

    /// The stream ended normally.
    pub fn complete(&mut self) {
        if let Some(InFlight {
            accumulator: Some(mut accumulator),
            index: Some(index),
        }) = self.in_flight.take()
        {
            accumulator.complete();
            self.messages[index] = accumulator.into_message();
        }
        self.loading = false;
        debug!(chat_id = %self.chat_id, "send completed");
    }

    /// The stream ended with `failure`; the partial message stays as it is.
    pub fn fail(&mut self, failure: &StreamFailure) {
        self.in_flight = None;
        self.loading = false;
        let notification = match failure {
            StreamFailure::Cancelled => Notification::info("Response cancelled"),
            other => {
                warn!(chat_id = %self.chat_id, failure = %other, "send failed");
                Notification::error(format!("Failed to get a response: {other}"))
            }
        };
        self.notifications.push(notification);
    }

    /// Window title: a backend title when present, else the first user message.
    pub fn title(&self) -> String {
        if let Some(title) = self.chat.as_ref().map(|chat| chat.title.trim()).filter(|t| !t.is_empty()) {
            return format!("{title} - {}", self.app_name);
        }
        match self.messages.iter().find(|m| m.role == Role::User) {
            Some(first) => {
                let prefix: String = first.text_content().chars().take(TITLE_PREFIX_CHARS).collect();
                format!("{prefix} - {}", self.app_name)
            }
            None => self.app_name.clone(),
        }
    }

    /// Scroll to the bottom whenever the newest message is the user's.
    pub fn should_auto_scroll(&self) -> bool {
        self.messages.last().is_some_and(Message::is_user)
    }

    /// Whether the message at `index` is the one still being streamed.
    pub fn is_streaming_message(&self, index: usize) -> bool {
        self.loading && index + 1 == self.messages.len()
    }
}

fn new_message_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..14].to_string()
}
