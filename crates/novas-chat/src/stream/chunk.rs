//! Chunks of the UI message stream protocol (one JSON object per SSE frame).

use serde::Deserialize;
use serde_json::Value;

use novas_parts::part::DATA_PREFIX;

/// A `data-<name>` chunk; chunks with the same `id` replace each other.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChunk {
    pub type_name: String,
    pub id: Option<String>,
    pub data: Value,
    /// Transient data is delivered to observers but never stored in the message.
    pub transient: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UiStreamChunk {
    Start {
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        message_metadata: Option<Value>,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    /// Whole reasoning text in a single chunk.
    Reasoning {
        text: String,
    },
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        provider_executed: Option<bool>,
    },
    ToolInputDelta {
        tool_call_id: String,
        input_text_delta: String,
    },
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        input: Value,
        #[serde(default)]
        provider_executed: Option<bool>,
    },
    ToolOutputAvailable {
        tool_call_id: String,
        #[serde(default)]
        output: Value,
    },
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },
    SourceUrl {
        source_id: String,
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        provider_metadata: Option<Value>,
    },
    SourceDocument {
        source_id: String,
        media_type: String,
        title: String,
        #[serde(default)]
        filename: Option<String>,
    },
    File {
        url: String,
        media_type: String,
    },
    #[serde(skip)]
    Data(DataChunk),
    StartStep,
    FinishStep,
    MessageMetadata {
        message_metadata: Value,
    },
    Finish {
        #[serde(default)]
        message_metadata: Option<Value>,
    },
    Error {
        error_text: String,
    },
    #[serde(other)]
    Unknown,
}

impl UiStreamChunk {
    /// Parses one frame payload. `Ok(None)` for chunk types this client does not know.
    pub fn parse(data: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_str(data)?;
        let type_name = value.get("type").and_then(Value::as_str).unwrap_or_default();
        if type_name.starts_with(DATA_PREFIX) {
            return Ok(Some(Self::Data(DataChunk {
                type_name: type_name.to_string(),
                id: value.get("id").and_then(Value::as_str).map(str::to_owned),
                data: value.get("data").cloned().unwrap_or(Value::Null),
                transient: value.get("transient").and_then(Value::as_bool).unwrap_or(false),
            })));
        }
        match Self::deserialize(value)? {
            Self::Unknown => Ok(None),
            chunk => Ok(Some(chunk)),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Start { .. } => "start",
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::ReasoningStart { .. } => "reasoning-start",
            Self::ReasoningDelta { .. } => "reasoning-delta",
            Self::ReasoningEnd { .. } => "reasoning-end",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputDelta { .. } => "tool-input-delta",
            Self::ToolInputAvailable { .. } => "tool-input-available",
            Self::ToolOutputAvailable { .. } => "tool-output-available",
            Self::ToolOutputError { .. } => "tool-output-error",
            Self::SourceUrl { .. } => "source-url",
            Self::SourceDocument { .. } => "source-document",
            Self::File { .. } => "file",
            Self::Data(data) => &data.type_name,
            Self::StartStep => "start-step",
            Self::FinishStep => "finish-step",
            Self::MessageMetadata { .. } => "message-metadata",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }
}
