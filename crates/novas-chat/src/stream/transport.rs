use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream::{self, Stream};
use serde::Serialize;
use tracing::debug;

use novas_parts::Message;

use super::chunk::UiStreamChunk;
use super::sse::{SseDecoder, SseEvent};
use crate::config::ClientConfig;
use crate::errors::{ChatError, StreamFailure};

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<UiStreamChunk, StreamFailure>> + Send + 'static>>;

type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, String>> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    pub focus_mode: String,
    pub optimization_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
}

/// Body of a streaming send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatStreamRequest {
    pub id: String,
    pub messages: Vec<Message>,
    pub options: StreamOptions,
}

/// Opens the chunk stream of one send.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatStreamRequest) -> Result<ChunkStream, ChatError>;
}

/// `POST`s the request to the streaming endpoint and decodes the SSE response.
pub struct HttpChatTransport {
    client: reqwest::Client,
    stream_url: String,
}

impl HttpChatTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ChatError> {
        // No overall timeout: a healthy stream may stay open for minutes.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build stream client: {e}")))?;
        Ok(Self {
            client,
            stream_url: config.resolved_stream_url(),
        })
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, request: &ChatStreamRequest) -> Result<ChunkStream, ChatError> {
        debug!(chat_id = %request.id, messages = request.messages.len(), url = %self.stream_url, "opening chat stream");
        let response = self
            .client
            .post(&self.stream_url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("chat stream request failed: {e}")))?;
        let status = response.status();
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
        let bytes = response.bytes_stream().map(|chunk| chunk.map_err(|e| e.to_string()));
        Ok(chunk_stream(bytes))
    }
}

/// Decodes a byte stream of SSE frames into protocol chunks.
///
/// Unknown chunk types are skipped; `[DONE]` ends the stream.
pub fn chunk_stream<S>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<bytes::Bytes, String>> + Send + 'static,
{
    struct State {
        bytes: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<UiStreamChunk>,
        ended: bool,
    }

    let stream = stream::try_unfold(
        State {
            bytes: Box::pin(bytes),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            ended: false,
        },
        |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Ok(Some((chunk, state)));
                }
                if state.ended || state.decoder.is_done() {
                    return Ok(None);
                }
                match state.bytes.next().await {
                    Some(Ok(bytes)) => {
                        let events = state.decoder.feed(&bytes);
                        queue_events(events, &mut state.pending)?;
                    }
                    Some(Err(e)) => {
                        return Err(StreamFailure::transport(format!("chat stream read failed: {e}")));
                    }
                    None => {
                        queue_events(state.decoder.finish(), &mut state.pending)?;
                        state.ended = true;
                    }
                }
            }
        },
    );
    Box::pin(stream)
}

/// Queues the chunks carried by `events`.
fn queue_events(
    events: impl IntoIterator<Item = SseEvent>,
    pending: &mut VecDeque<UiStreamChunk>,
) -> Result<(), StreamFailure> {
    for event in events {
        let SseEvent::Data(data) = event else {
            break;
        };
        match UiStreamChunk::parse(&data) {
            Ok(Some(chunk)) => pending.push_back(chunk),
            Ok(None) => debug!(data = %data, "unknown stream chunk skipped"),
            Err(e) => {
                return Err(StreamFailure::protocol(format!("invalid stream chunk: {e}")));
            }
        }
    }
    Ok(())
}

/// Decodes a captured SSE body in one go.
pub fn decode_sse_body(body: &[u8]) -> Result<Vec<UiStreamChunk>, StreamFailure> {
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();
    queue_events(decoder.feed(body), &mut pending)?;
    queue_events(decoder.finish(), &mut pending)?;
    Ok(pending.into())
}
