//! UI message stream protocol: SSE framing, chunk model, reducer and transport.

pub mod chunk;
pub mod reducer;
pub mod sse;
pub mod transport;

pub use chunk::{DataChunk, UiStreamChunk};
pub use reducer::{ChunkEffect, MessageAccumulator, parse_partial_json};
pub use sse::{SseDecoder, SseEvent};
pub use transport::{
    ChatStreamRequest, ChatTransport, ChunkStream, HttpChatTransport, StreamOptions, chunk_stream,
    decode_sse_body,
};
