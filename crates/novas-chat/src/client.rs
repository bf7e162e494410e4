//! Async driver that runs a [`ChatSession`] against the chat API and stream
//! transport.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info};

use novas_parts::Message;

use crate::api::{ChatApi, Page};
use crate::config::{ClientConfig, ClientSettings, SettingsStore};
use crate::errors::{ChatError, StreamFailure};
use crate::pending::PendingChatStore;
use crate::session::{ChatSession, InitStep};
use crate::stream::{ChatStreamRequest, ChatTransport, ChunkEffect, ChunkStream, UiStreamChunk};

/// Handle used to cancel the send in flight.
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Requests cancellation of the send in flight, or of the next send when
    /// none is running. The partial message is kept and the send ends with
    /// `ChatError::Cancelled`.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// One chat screen: owns the session and drives its I/O.
pub struct ChatClient {
    api: Arc<dyn ChatApi>,
    transport: Arc<dyn ChatTransport>,
    settings_store: Arc<dyn SettingsStore>,
    pending: PendingChatStore,
    session: ChatSession,
    abort_tx: Arc<watch::Sender<bool>>,
    idle_timeout: Option<Duration>,
}

impl ChatClient {
    pub fn new(
        chat_id: impl Into<String>,
        config: &ClientConfig,
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn ChatTransport>,
        settings_store: Arc<dyn SettingsStore>,
        pending: PendingChatStore,
    ) -> Self {
        let (abort_tx, _) = watch::channel(false);
        Self {
            api,
            transport,
            settings_store,
            pending,
            session: ChatSession::new(chat_id).with_app_name(config.app_name.clone()),
            abort_tx: Arc::new(abort_tx),
            idle_timeout: config.stream_idle_timeout,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: Arc::clone(&self.abort_tx),
        }
    }

    /// Configures the session, then creates or fetches the chat and loads its
    /// history. A pending initial message is sent once the session is ready.
    ///
    /// Failures land in the session phase and notifications; the returned error
    /// mirrors them.
    pub async fn initialize(&mut self) -> Result<(), ChatError> {
        self.session.begin_configuring();
        let settings = match ClientSettings::load(self.settings_store.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                self.session.configuration_failed(&err);
                return Err(err);
            }
        };
        let pending = self.pending.take(self.session.chat_id());
        let mut step = self.session.configuration_loaded(settings, pending);
        loop {
            step = match step {
                InitStep::Create(request) => match self.api.create_chat(&request).await {
                    Ok(chat) => self.session.chat_created(chat),
                    Err(err) => return Err(self.init_failed(err)),
                },
                InitStep::Fetch(chat_id) => match self.api.get_chat(&chat_id).await {
                    Ok(chat) => self.session.chat_fetched(chat),
                    Err(err) => return Err(self.init_failed(err)),
                },
                InitStep::LoadMessages(chat_id) => match self.api.get_messages(&chat_id, Page::default()).await {
                    Ok(messages) => self.session.messages_loaded(messages),
                    Err(err) => return Err(self.init_failed(err)),
                },
                InitStep::Done => break,
            };
        }
        info!(chat_id = %self.session.chat_id(), messages = self.session.messages().len(), "chat session ready");

        if let Some(message) = self.session.take_initial_message() {
            self.send(&message).await?;
        }
        Ok(())
    }

    fn init_failed(&mut self, err: ChatError) -> ChatError {
        self.session.initialization_failed(&err);
        err
    }

    /// Sends `text` and streams the reply into the session.
    pub async fn send(&mut self, text: &str) -> Result<(), ChatError> {
        self.send_observed(text, |_| {}).await
    }

    /// Like [`Self::send`], calling `observer` with the assistant message after
    /// every chunk that changed it.
    pub async fn send_observed<F>(&mut self, text: &str, observer: F) -> Result<(), ChatError>
    where
        F: FnMut(&Message),
    {
        match self.session.begin_send(text, None)? {
            Some(request) => self.run_stream(request, observer).await,
            None => Ok(()),
        }
    }

    /// Regenerates the reply `assistant_message_id`.
    pub async fn rewrite(&mut self, assistant_message_id: &str) -> Result<(), ChatError> {
        match self.session.rewrite(assistant_message_id)? {
            Some(request) => self.run_stream(request, |_| {}).await,
            None => Ok(()),
        }
    }

    async fn run_stream<F>(&mut self, request: ChatStreamRequest, mut observer: F) -> Result<(), ChatError>
    where
        F: FnMut(&Message),
    {
        let mut abort_rx = self.abort_tx.subscribe();
        let mut send = InFlightSend {
            session: &mut self.session,
            abort: &self.abort_tx,
            armed: true,
        };

        let mut stream = tokio::select! {
            biased;
            _ = abort_requested(&mut abort_rx) => return Err(send.fail(StreamFailure::Cancelled)),
            opened = self.transport.open(&request) => match opened {
                Ok(stream) => stream,
                Err(err) => {
                    send.fail(StreamFailure::transport(err.to_string()));
                    return Err(err);
                }
            },
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = abort_requested(&mut abort_rx) => Err(StreamFailure::Cancelled),
                next = next_chunk(&mut stream, self.idle_timeout) => next,
            };
            let chunk = match next {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(failure) => return Err(send.fail(failure)),
            };
            match send.session.apply_chunk(chunk) {
                Ok(ChunkEffect::Updated | ChunkEffect::Finished) => {
                    if let Some(message) = send.session.messages().last() {
                        observer(message);
                    }
                }
                Ok(ChunkEffect::Transient(data)) => {
                    debug!(data_type = %data.type_name, "transient data chunk");
                }
                Ok(ChunkEffect::Unchanged) => {}
                Err(failure) => return Err(send.fail(failure)),
            }
        }

        send.finish();
        if let Some(message) = self.session.messages().last() {
            observer(message);
        }
        Ok(())
    }
}

/// The send being streamed. Dropping it while still armed (the driving future
/// was dropped mid-stream) fails the send as cancelled. The abort flag is
/// cleared whenever a send ends.
struct InFlightSend<'a> {
    session: &'a mut ChatSession,
    abort: &'a watch::Sender<bool>,
    armed: bool,
}

impl InFlightSend<'_> {
    fn finish(mut self) {
        self.armed = false;
        self.session.complete();
    }

    fn fail(mut self, failure: StreamFailure) -> ChatError {
        self.armed = false;
        self.session.fail(&failure);
        failure.into()
    }
}

impl Drop for InFlightSend<'_> {
    fn drop(&mut self) {
        self.abort.send_replace(false);
        if self.armed {
            debug!(chat_id = %self.session.chat_id(), "send dropped mid-stream");
            self.session.fail(&StreamFailure::Cancelled);
        }
    }
}

/// Resolves once an abort was requested, including one requested before the
/// send started.
async fn abort_requested(abort_rx: &mut watch::Receiver<bool>) {
    if abort_rx.wait_for(|aborted| *aborted).await.is_err() {
        futures::future::pending::<()>().await;
    }
}

/// Next chunk, or a timeout failure once the stream was idle for `idle`.
async fn next_chunk(
    stream: &mut ChunkStream,
    idle: Option<Duration>,
) -> Result<Option<UiStreamChunk>, StreamFailure> {
    let next = match idle {
        Some(idle) => tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| StreamFailure::Timeout {
                seconds: idle.as_secs(),
            })?,
        None => stream.next().await,
    };
    next.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::StreamExt as _;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use novas_parts::{Chat, Role};

    use crate::api::{ChatUpdate, CreateChatRequest};
    use crate::config::MemorySettingsStore;
    use crate::errors::NotificationLevel;
    use crate::pending::PendingChat;
    use crate::session::{FailureReason, SessionPhase};

    #[derive(Default)]
    struct FakeApi {
        chats: Mutex<Vec<Chat>>,
        history: Vec<Message>,
        created: Mutex<Vec<CreateChatRequest>>,
        fail_messages: bool,
    }

    fn chat(id: &str) -> Chat {
        serde_json::from_value(json!({"id": id, "title": ""})).expect("chat")
    }

    #[async_trait::async_trait]
    impl ChatApi for FakeApi {
        async fn list_chats(&self) -> Result<Vec<Chat>, ChatError> {
            Ok(self.chats.lock().expect("lock").clone())
        }

        async fn get_chat(&self, chat_id: &str) -> Result<Chat, ChatError> {
            self.chats
                .lock()
                .expect("lock")
                .iter()
                .find(|chat| chat.id == chat_id)
                .cloned()
                .ok_or_else(|| ChatError::NotFound(chat_id.to_string()))
        }

        async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat, ChatError> {
            self.created.lock().expect("lock").push(request.clone());
            let chat = chat("backend-1");
            self.chats.lock().expect("lock").push(chat.clone());
            Ok(chat)
        }

        async fn update_chat(&self, chat_id: &str, _update: &ChatUpdate) -> Result<Chat, ChatError> {
            self.get_chat(chat_id).await
        }

        async fn delete_chat(&self, _chat_id: &str) -> Result<(), ChatError> {
            Ok(())
        }

        async fn get_messages(&self, _chat_id: &str, _page: Page) -> Result<Vec<Message>, ChatError> {
            if self.fail_messages {
                return Err(ChatError::Api {
                    status: 500,
                    message: "db down".into(),
                });
            }
            Ok(self.history.clone())
        }

        async fn get_config(&self) -> Result<Value, ChatError> {
            Ok(Value::Null)
        }

        async fn update_config(&self, config: &Value) -> Result<Value, ChatError> {
            Ok(config.clone())
        }
    }

    /// Replays a fixed script; `None` entries hang forever.
    struct FakeTransport {
        script: Vec<Option<Value>>,
        requests: Mutex<Vec<ChatStreamRequest>>,
        abort_on_open: Mutex<Option<AbortHandle>>,
    }

    impl FakeTransport {
        fn new(script: Vec<Option<Value>>) -> Self {
            Self {
                script,
                requests: Mutex::new(Vec::new()),
                abort_on_open: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for FakeTransport {
        async fn open(&self, request: &ChatStreamRequest) -> Result<ChunkStream, ChatError> {
            self.requests.lock().expect("lock").push(request.clone());
            if let Some(handle) = self.abort_on_open.lock().expect("lock").take() {
                handle.abort();
            }
            let items: Vec<Option<Value>> = self.script.clone();
            let chunks = stream::iter(items).then(|item| async move {
                match item {
                    Some(value) => UiStreamChunk::parse(&value.to_string())
                        .map_err(|e| StreamFailure::protocol(e.to_string()))
                        .and_then(|chunk| chunk.ok_or_else(|| StreamFailure::protocol("unknown"))),
                    None => futures::future::pending().await,
                }
            });
            Ok(Box::pin(chunks))
        }
    }

    fn client(api: FakeApi, transport: FakeTransport, config: ClientConfig) -> (ChatClient, Arc<FakeTransport>, PendingChatStore) {
        let transport = Arc::new(transport);
        let pending = PendingChatStore::new();
        let client = ChatClient::new(
            "c1",
            &config,
            Arc::new(api),
            transport.clone(),
            Arc::new(MemorySettingsStore::new()),
            pending.clone(),
        );
        (client, transport, pending)
    }

    fn reply_script() -> Vec<Option<Value>> {
        vec![
            Some(json!({"type": "start", "messageId": "a1"})),
            Some(json!({"type": "text-start", "id": "t"})),
            Some(json!({"type": "text-delta", "id": "t", "delta": "Hello"})),
            Some(json!({"type": "text-delta", "id": "t", "delta": " there"})),
            Some(json!({"type": "text-end", "id": "t"})),
            Some(json!({"type": "finish"})),
        ]
    }

    #[tokio::test]
    async fn existing_chat_loads_history_and_streams_reply() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            history: vec![Message::user_text("u0", "earlier")],
            ..FakeApi::default()
        };
        let (mut client, transport, _) = client(api, FakeTransport::new(reply_script()), ClientConfig::default());
        client.initialize().await.expect("initialized");
        assert!(client.session().is_ready());
        assert_eq!(client.session().messages().len(), 1);

        let mut seen = Vec::new();
        client
            .send_observed("hi", |message| seen.push(message.text_content()))
            .await
            .expect("sent");
        assert_eq!(seen.last().map(String::as_str), Some("Hello there"));
        assert!(!client.session().is_loading());

        let messages = client.session().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].id, "a1");
        assert_eq!(messages[2].role, Role::Assistant);
        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn pending_chat_is_created_then_first_message_sent() {
        let (mut client, transport, pending) =
            client(FakeApi::default(), FakeTransport::new(reply_script()), ClientConfig::default());
        pending.insert("c1", PendingChat::with_message("first question"));
        client.initialize().await.expect("initialized");

        assert_eq!(client.session().chat_id(), "backend-1");
        assert!(client.session().new_chat_created());
        assert!(pending.is_empty());
        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "backend-1");
        assert_eq!(requests[0].messages[0].text_content(), "first question");
    }

    #[tokio::test]
    async fn unknown_chat_ends_in_not_found() {
        let (mut client, _, _) = client(FakeApi::default(), FakeTransport::new(vec![]), ClientConfig::default());
        let err = client.initialize().await.expect_err("not found");
        assert_eq!(err, ChatError::NotFound("c1".into()));
        assert_eq!(client.session().phase(), &SessionPhase::NotFound);
    }

    #[tokio::test]
    async fn history_failure_is_reported_once() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            fail_messages: true,
            ..FakeApi::default()
        };
        let (mut client, _, _) = client(api, FakeTransport::new(vec![]), ClientConfig::default());
        assert!(client.initialize().await.is_err());
        assert!(matches!(
            client.session().phase(),
            SessionPhase::Failed(FailureReason::Initialization(_))
        ));
        let notifications = client.session_mut().take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert!(matches!(client.send("hi").await, Err(ChatError::NotReady(_))));
    }

    #[tokio::test]
    async fn abort_keeps_partial_message() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            ..FakeApi::default()
        };
        let script = vec![Some(json!({"type": "text-delta", "id": "t", "delta": "Partial"})), None];
        let (mut client, _, _) = client(api, FakeTransport::new(script), ClientConfig::default());
        client.initialize().await.expect("initialized");

        let handle = client.abort_handle();
        let err = client
            .send_observed("q", |message| {
                if message.text_content() == "Partial" {
                    handle.abort();
                }
            })
            .await
            .expect_err("cancelled");
        assert_eq!(err, ChatError::Cancelled);
        assert!(!client.session().is_loading());
        assert_eq!(client.session().messages()[1].text_content(), "Partial");
        let notifications = client.session_mut().take_notifications();
        assert_eq!(notifications[0].level, NotificationLevel::Info);
    }

    #[tokio::test]
    async fn idle_stream_times_out() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            ..FakeApi::default()
        };
        let config = ClientConfig::default().stream_idle_timeout(Duration::from_millis(20));
        let (mut client, _, _) = client(api, FakeTransport::new(vec![None]), config);
        client.initialize().await.expect("initialized");
        let err = client.send("q").await.expect_err("timeout");
        assert!(matches!(err, ChatError::StreamFailed(StreamFailure::Timeout { .. })));
        assert!(!client.session().is_loading());
    }

    #[tokio::test]
    async fn dropped_send_releases_the_session() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            ..FakeApi::default()
        };
        let script = vec![Some(json!({"type": "text-delta", "id": "t", "delta": "Partial"})), None];
        let (mut client, transport, _) = client(api, FakeTransport::new(script), ClientConfig::default());
        client.initialize().await.expect("initialized");

        let dropped = tokio::time::timeout(Duration::from_millis(50), client.send("q")).await;
        assert!(dropped.is_err());
        assert!(!client.session().is_loading());
        assert_eq!(client.session().messages()[1].text_content(), "Partial");
        let notifications = client.session_mut().take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Info);

        let again = tokio::time::timeout(Duration::from_millis(50), client.send("again")).await;
        assert!(again.is_err());
        assert_eq!(transport.requests.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn abort_while_connecting_cancels_the_send() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            ..FakeApi::default()
        };
        let (mut client, transport, _) = client(api, FakeTransport::new(reply_script()), ClientConfig::default());
        client.initialize().await.expect("initialized");
        *transport.abort_on_open.lock().expect("lock") = Some(client.abort_handle());

        assert_eq!(client.send("q").await, Err(ChatError::Cancelled));
        assert!(!client.session().is_loading());
        assert!(client.session().messages().iter().all(|m| m.id != "a1"));

        client.send("again").await.expect("flag cleared after the cancelled send");
        assert_eq!(client.session().messages().last().map(Message::text_content).as_deref(), Some("Hello there"));
    }

    #[tokio::test]
    async fn abort_before_send_cancels_it() {
        let api = FakeApi {
            chats: Mutex::new(vec![chat("c1")]),
            ..FakeApi::default()
        };
        let (mut client, transport, _) = client(api, FakeTransport::new(reply_script()), ClientConfig::default());
        client.initialize().await.expect("initialized");

        client.abort_handle().abort();
        assert_eq!(client.send("q").await, Err(ChatError::Cancelled));
        assert!(transport.requests.lock().expect("lock").is_empty());
        assert!(!client.session().is_loading());
    }
}
