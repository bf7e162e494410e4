//! Folds stream chunks into the parts of the in-flight assistant message.
//!
//! Text and reasoning deltas are keyed by their chunk `id`, tool chunks by
//! `toolCallId`. A tool part only ever moves forward through its lifecycle:
//! chunks that would move it backwards, or overwrite a terminal state, are
//! dropped with a warning.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use novas_parts::{
    DataPart, FilePart, Message, MessageMetadata, Part, ReasoningPart, Role, SourceDocumentPart,
    SourceUrlPart, TextPart, TextState, ToolPart, ToolState,
};

use super::chunk::{DataChunk, UiStreamChunk};
use crate::errors::StreamFailure;

/// What applying a chunk did to the message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkEffect {
    /// The message changed.
    Updated,
    /// Nothing to show (bookkeeping chunk, or a chunk that was ignored).
    Unchanged,
    /// A transient data chunk that is not stored in the message.
    Transient(DataChunk),
    /// The server finished the message.
    Finished,
}

pub struct MessageAccumulator {
    message: Message,
    text_parts: HashMap<String, usize>,
    reasoning_parts: HashMap<String, usize>,
    tool_parts: HashMap<String, usize>,
    tool_input_text: HashMap<String, String>,
    finished: bool,
}

impl MessageAccumulator {
    pub fn new(message_id: impl Into<String>) -> Self {
        let mut message = Message::new(message_id, Role::Assistant);
        message.metadata = Some(MessageMetadata::created_now());
        Self::from_message(message)
    }

    /// Continues an existing assistant message.
    pub fn from_message(message: Message) -> Self {
        let tool_parts = message
            .parts
            .iter()
            .enumerate()
            .filter_map(|(index, part)| part.as_tool().map(|tool| (tool.tool_call_id.clone(), index)))
            .collect();
        Self {
            message,
            text_parts: HashMap::new(),
            reasoning_parts: HashMap::new(),
            tool_parts,
            tool_input_text: HashMap::new(),
            finished: false,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn apply(&mut self, chunk: UiStreamChunk) -> Result<ChunkEffect, StreamFailure> {
        debug!(message_id = %self.message.id, chunk = chunk.kind(), "applying stream chunk");
        let effect = match chunk {
            UiStreamChunk::Start {
                message_id,
                message_metadata,
            } => {
                if let Some(id) = message_id.filter(|id| !id.is_empty()) {
                    self.message.id = id;
                }
                if let Some(metadata) = message_metadata {
                    self.merge_metadata(&metadata);
                }
                ChunkEffect::Updated
            }
            UiStreamChunk::TextStart { id } => {
                let index = self.push(Part::Text(TextPart {
                    text: String::new(),
                    state: Some(TextState::Streaming),
                }));
                self.text_parts.insert(id, index);
                ChunkEffect::Updated
            }
            UiStreamChunk::TextDelta { id, delta } => {
                let index = self.text_index(&id);
                if let Some(Part::Text(text)) = self.message.parts.get_mut(index) {
                    text.text.push_str(&delta);
                }
                ChunkEffect::Updated
            }
            UiStreamChunk::TextEnd { id } => match self.text_parts.remove(&id) {
                Some(index) => {
                    if let Some(Part::Text(text)) = self.message.parts.get_mut(index) {
                        text.state = Some(TextState::Done);
                    }
                    ChunkEffect::Updated
                }
                None => ChunkEffect::Unchanged,
            },
            UiStreamChunk::ReasoningStart { id } => {
                let index = self.push(Part::Reasoning(ReasoningPart {
                    text: String::new(),
                    state: Some(TextState::Streaming),
                    provider_metadata: None,
                }));
                self.reasoning_parts.insert(id, index);
                ChunkEffect::Updated
            }
            UiStreamChunk::ReasoningDelta { id, delta } => {
                let index = self.reasoning_index(&id);
                if let Some(Part::Reasoning(reasoning)) = self.message.parts.get_mut(index) {
                    reasoning.text.push_str(&delta);
                }
                ChunkEffect::Updated
            }
            UiStreamChunk::ReasoningEnd { id } => match self.reasoning_parts.remove(&id) {
                Some(index) => {
                    if let Some(Part::Reasoning(reasoning)) = self.message.parts.get_mut(index) {
                        reasoning.state = Some(TextState::Done);
                    }
                    ChunkEffect::Updated
                }
                None => ChunkEffect::Unchanged,
            },
            UiStreamChunk::Reasoning { text } => {
                self.push(Part::Reasoning(ReasoningPart {
                    text,
                    state: Some(TextState::Done),
                    provider_metadata: None,
                }));
                ChunkEffect::Updated
            }
            UiStreamChunk::ToolInputStart {
                tool_call_id,
                tool_name,
                provider_executed,
            } => {
                if self.tool_parts.contains_key(&tool_call_id) {
                    warn!(tool_call_id = %tool_call_id, "duplicate tool-input-start ignored");
                    return Ok(ChunkEffect::Unchanged);
                }
                let mut tool = ToolPart::new(&tool_name, tool_call_id.clone(), ToolState::InputStreaming);
                tool.provider_executed = provider_executed;
                let index = self.push(Part::Tool(tool));
                self.tool_parts.insert(tool_call_id.clone(), index);
                self.tool_input_text.insert(tool_call_id, String::new());
                ChunkEffect::Updated
            }
            UiStreamChunk::ToolInputDelta {
                tool_call_id,
                input_text_delta,
            } => {
                let buffer = self.tool_input_text.entry(tool_call_id.clone()).or_default();
                buffer.push_str(&input_text_delta);
                let input = parse_partial_json(buffer);
                self.advance_tool(&tool_call_id, None, ToolState::InputStreaming, |tool| {
                    if input.is_some() {
                        tool.input = input;
                    }
                })
            }
            UiStreamChunk::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
                provider_executed,
            } => {
                self.tool_input_text.remove(&tool_call_id);
                self.advance_tool(&tool_call_id, Some(&tool_name), ToolState::InputAvailable, |tool| {
                    tool.input = Some(input);
                    if provider_executed.is_some() {
                        tool.provider_executed = provider_executed;
                    }
                })
            }
            UiStreamChunk::ToolOutputAvailable { tool_call_id, output } => {
                self.advance_tool(&tool_call_id, None, ToolState::OutputAvailable, |tool| {
                    tool.output = Some(output);
                })
            }
            UiStreamChunk::ToolOutputError {
                tool_call_id,
                error_text,
            } => self.advance_tool(&tool_call_id, None, ToolState::OutputError, |tool| {
                tool.error_text = Some(error_text);
            }),
            UiStreamChunk::SourceUrl {
                source_id,
                url,
                title,
                provider_metadata,
            } => {
                self.push(Part::SourceUrl(SourceUrlPart {
                    source_id,
                    url,
                    title,
                    provider_metadata,
                }));
                ChunkEffect::Updated
            }
            UiStreamChunk::SourceDocument {
                source_id,
                media_type,
                title,
                filename,
            } => {
                self.push(Part::SourceDocument(SourceDocumentPart {
                    source_id,
                    media_type,
                    title,
                    filename,
                }));
                ChunkEffect::Updated
            }
            UiStreamChunk::File { url, media_type } => {
                self.push(Part::File(FilePart {
                    media_type,
                    filename: None,
                    url,
                }));
                ChunkEffect::Updated
            }
            UiStreamChunk::Data(chunk) => self.apply_data(chunk),
            UiStreamChunk::StartStep => {
                self.push(Part::StepStart);
                ChunkEffect::Updated
            }
            UiStreamChunk::FinishStep => {
                self.text_parts.clear();
                self.reasoning_parts.clear();
                ChunkEffect::Unchanged
            }
            UiStreamChunk::MessageMetadata { message_metadata } => {
                self.merge_metadata(&message_metadata);
                ChunkEffect::Updated
            }
            UiStreamChunk::Finish { message_metadata } => {
                if let Some(metadata) = message_metadata {
                    self.merge_metadata(&metadata);
                }
                self.finished = true;
                ChunkEffect::Finished
            }
            UiStreamChunk::Error { error_text } => return Err(StreamFailure::server(error_text)),
            UiStreamChunk::Unknown => ChunkEffect::Unchanged,
        };
        Ok(effect)
    }

    /// Stamps `completedAt` and closes any part still marked as streaming.
    pub fn complete(&mut self) {
        for part in &mut self.message.parts {
            match part {
                Part::Text(TextPart { state, .. }) | Part::Reasoning(ReasoningPart { state, .. })
                    if *state == Some(TextState::Streaming) =>
                {
                    *state = Some(TextState::Done);
                }
                _ => {}
            }
        }
        let metadata = self.message.metadata.get_or_insert_with(MessageMetadata::default);
        if metadata.completed_at.is_none() {
            metadata.completed_at = Some(chrono::Utc::now().to_rfc3339());
        }
    }

    fn push(&mut self, part: Part) -> usize {
        self.message.parts.push(part);
        self.message.parts.len() - 1
    }

    /// Part index for a text delta; a delta without a start opens a new part.
    fn text_index(&mut self, id: &str) -> usize {
        if let Some(index) = self.text_parts.get(id) {
            return *index;
        }
        let index = self.push(Part::Text(TextPart {
            text: String::new(),
            state: Some(TextState::Streaming),
        }));
        self.text_parts.insert(id.to_string(), index);
        index
    }

    fn reasoning_index(&mut self, id: &str) -> usize {
        if let Some(index) = self.reasoning_parts.get(id) {
            return *index;
        }
        let index = self.push(Part::Reasoning(ReasoningPart {
            text: String::new(),
            state: Some(TextState::Streaming),
            provider_metadata: None,
        }));
        self.reasoning_parts.insert(id.to_string(), index);
        index
    }

    fn advance_tool(
        &mut self,
        tool_call_id: &str,
        tool_name: Option<&str>,
        next: ToolState,
        update: impl FnOnce(&mut ToolPart),
    ) -> ChunkEffect {
        let index = match (self.tool_parts.get(tool_call_id), tool_name) {
            (Some(index), _) => *index,
            (None, Some(name)) => {
                let index = self.push(Part::Tool(ToolPart::new(name, tool_call_id, next.clone())));
                self.tool_parts.insert(tool_call_id.to_string(), index);
                index
            }
            (None, None) => {
                warn!(tool_call_id, state = %next, "chunk for unknown tool call ignored");
                return ChunkEffect::Unchanged;
            }
        };
        let Some(Part::Tool(tool)) = self.message.parts.get_mut(index) else {
            return ChunkEffect::Unchanged;
        };
        if !tool.state.can_advance_to(&next) {
            warn!(tool_call_id, from = %tool.state, to = %next, "out-of-order tool state ignored");
            return ChunkEffect::Unchanged;
        }
        tool.state = next;
        update(tool);
        ChunkEffect::Updated
    }

    fn apply_data(&mut self, chunk: DataChunk) -> ChunkEffect {
        if chunk.transient {
            return ChunkEffect::Transient(chunk);
        }
        let existing = chunk.id.as_ref().and_then(|id| {
            self.message.parts.iter().position(|part| match part {
                Part::Data(data) => data.type_name == chunk.type_name && data.id.as_ref() == Some(id),
                _ => false,
            })
        });
        let part = Part::Data(DataPart {
            type_name: chunk.type_name,
            id: chunk.id,
            data: chunk.data,
        });
        match existing {
            Some(index) => self.message.parts[index] = part,
            None => {
                self.push(part);
            }
        }
        ChunkEffect::Updated
    }

    fn merge_metadata(&mut self, value: &Value) {
        self.message
            .metadata
            .get_or_insert_with(MessageMetadata::default)
            .merge(value);
    }
}

/// Best-effort parse of a JSON document that may be cut off mid-way: open
/// strings, arrays and objects are closed before parsing.
pub fn parse_partial_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            _ => {}
        }
    }
    let mut repaired = text.trim_end().to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }
    let trimmed = repaired.trim_end_matches([',', ':', ' ']).len();
    repaired.truncate(trimmed);
    repaired.extend(closers.iter().rev());
    serde_json::from_str(&repaired).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn chunk(value: Value) -> UiStreamChunk {
        UiStreamChunk::parse(&value.to_string())
            .expect("valid")
            .expect("known chunk")
    }

    fn apply_all(acc: &mut MessageAccumulator, chunks: Vec<Value>) {
        for value in chunks {
            acc.apply(chunk(value)).expect("applied");
        }
    }

    #[test]
    fn text_deltas_accumulate_into_one_part() {
        let mut acc = MessageAccumulator::new("local");
        apply_all(
            &mut acc,
            vec![
                json!({"type": "start", "messageId": "srv-1"}),
                json!({"type": "text-start", "id": "t1"}),
                json!({"type": "text-delta", "id": "t1", "delta": "Hel"}),
                json!({"type": "text-delta", "id": "t1", "delta": "lo"}),
                json!({"type": "text-end", "id": "t1"}),
            ],
        );
        let message = acc.message();
        assert_eq!(message.id, "srv-1");
        assert_eq!(
            message.parts,
            vec![Part::Text(TextPart {
                text: "Hello".into(),
                state: Some(TextState::Done),
            })]
        );
    }

    #[test]
    fn tool_chunks_move_one_part_forward_only() {
        let mut acc = MessageAccumulator::new("m");
        apply_all(
            &mut acc,
            vec![
                json!({"type": "tool-input-start", "toolCallId": "c1", "toolName": "weather"}),
                json!({"type": "tool-input-delta", "toolCallId": "c1", "inputTextDelta": "{\"city\": \"Os"}),
            ],
        );
        let tool = acc.message().parts[0].as_tool().expect("tool").clone();
        assert_eq!(tool.type_name, "tool-weather");
        assert_eq!(tool.state, ToolState::InputStreaming);
        assert_eq!(tool.input, Some(json!({"city": "Os"})));

        apply_all(
            &mut acc,
            vec![
                json!({"type": "tool-input-available", "toolCallId": "c1", "toolName": "weather", "input": {"city": "Oslo"}}),
                json!({"type": "tool-output-available", "toolCallId": "c1", "output": {"temperature": 3}}),
            ],
        );
        let effect = acc
            .apply(chunk(json!({"type": "tool-input-available", "toolCallId": "c1", "toolName": "weather", "input": {}})))
            .expect("applied");
        assert_eq!(effect, ChunkEffect::Unchanged);
        let effect = acc
            .apply(chunk(json!({"type": "tool-output-error", "toolCallId": "c1", "errorText": "late"})))
            .expect("applied");
        assert_eq!(effect, ChunkEffect::Unchanged);

        assert_eq!(acc.message().parts.len(), 1);
        let tool = acc.message().parts[0].as_tool().expect("tool");
        assert_eq!(tool.state, ToolState::OutputAvailable);
        assert_eq!(tool.input, Some(json!({"city": "Oslo"})));
        assert_eq!(tool.output, Some(json!({"temperature": 3})));
        assert_eq!(tool.error_text, None);
    }

    #[test]
    fn output_for_unknown_tool_call_is_ignored() {
        let mut acc = MessageAccumulator::new("m");
        let effect = acc
            .apply(chunk(json!({"type": "tool-output-available", "toolCallId": "nope", "output": 1})))
            .expect("applied");
        assert_eq!(effect, ChunkEffect::Unchanged);
        assert!(acc.message().parts.is_empty());
    }

    #[test]
    fn data_parts_with_equal_id_replace_in_place() {
        let mut acc = MessageAccumulator::new("m");
        apply_all(
            &mut acc,
            vec![
                json!({"type": "data-status", "id": "s", "data": {"step": 1}}),
                json!({"type": "text-delta", "id": "t", "delta": "x"}),
                json!({"type": "data-status", "id": "s", "data": {"step": 2}}),
                json!({"type": "data-status", "data": {"step": 3}}),
            ],
        );
        let parts = &acc.message().parts;
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], Part::Data(d) if d.data == json!({"step": 2})));
        assert!(matches!(&parts[2], Part::Data(d) if d.id.is_none()));

        let effect = acc
            .apply(chunk(json!({"type": "data-toast", "data": "hi", "transient": true})))
            .expect("applied");
        assert!(matches!(effect, ChunkEffect::Transient(_)));
        assert_eq!(acc.message().parts.len(), 3);
    }

    #[test]
    fn error_chunk_is_a_server_failure_and_finish_completes() {
        let mut acc = MessageAccumulator::new("m");
        assert_eq!(
            acc.apply(chunk(json!({"type": "error", "errorText": "rate limited"}))),
            Err(StreamFailure::server("rate limited"))
        );
        apply_all(
            &mut acc,
            vec![
                json!({"type": "start-step"}),
                json!({"type": "reasoning-delta", "id": "r", "delta": "hmm"}),
                json!({"type": "finish", "messageMetadata": {"model": "m1"}}),
            ],
        );
        assert!(acc.is_finished());
        acc.complete();
        let message = acc.into_message();
        assert!(matches!(&message.parts[1], Part::Reasoning(r) if r.state == Some(TextState::Done)));
        let metadata = message.metadata.expect("metadata");
        assert!(metadata.completed_at.is_some());
        assert_eq!(metadata.extra.get("model"), Some(&json!("m1")));
    }

    #[test]
    fn partial_json_is_repaired() {
        assert_eq!(parse_partial_json(r#"{"a": [1, 2"#), Some(json!({"a": [1, 2]})));
        assert_eq!(parse_partial_json(r#"{"q": "rust \"la"#), Some(json!({"q": "rust \"la"})));
        assert_eq!(parse_partial_json(r#"{"a": 1,"#), Some(json!({"a": 1})));
        assert_eq!(parse_partial_json(""), None);
    }
}
