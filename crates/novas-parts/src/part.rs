//! Message parts as they arrive on the wire.
//!
//! # Shape
//!
//! A part is a JSON object discriminated by its `type` string. Known kinds are
//! parsed into typed variants; anything else (an unregistered `type`, or a known
//! `type` whose fields do not match the expected shape) is kept verbatim as
//! [`Part::Unknown`] so that rendering can fall back instead of failing.
//!
//! # Conversion
//!
//! [`Part`] converts from and into [`serde_json::Value`] and uses those
//! conversions for its serde implementation, so parsing never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TOOL_PREFIX: &str = "tool-";
pub const DATA_PREFIX: &str = "data-";

/// Streaming state for text and reasoning parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextState {
    Streaming,
    Done,
}

/// Lifecycle state of a tool call.
///
/// States only move forward: `input-streaming` → `input-available` →
/// `output-available` | `output-error`. A state string outside that set is kept
/// as [`ToolState::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
    Unknown(String),
}

impl ToolState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InputStreaming => "input-streaming",
            Self::InputAvailable => "input-available",
            Self::OutputAvailable => "output-available",
            Self::OutputError => "output-error",
            Self::Unknown(raw) => raw,
        }
    }

    /// Position in the lifecycle; `None` for unknown states.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::InputStreaming => Some(0),
            Self::InputAvailable => Some(1),
            Self::OutputAvailable | Self::OutputError => Some(2),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OutputAvailable | Self::OutputError)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Re-applying the same state is allowed (input deltas arrive while the
    /// state stays `input-streaming`); terminal states accept nothing else.
    pub fn can_advance_to(&self, next: &ToolState) -> bool {
        if self == next {
            return !self.is_terminal();
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(next)) => next > current,
            // Unknown states carry no ordering; accept a move into the known lifecycle.
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

impl From<String> for ToolState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input-streaming" => Self::InputStreaming,
            "input-available" => Self::InputAvailable,
            "output-available" => Self::OutputAvailable,
            "output-error" => Self::OutputError,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for ToolState {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ToolState> for String {
    fn from(value: ToolState) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ToolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TextState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TextState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<Value>,
}

/// A tool invocation; `type_name` is the full `tool-<name>` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    #[serde(skip)]
    pub type_name: String,
    #[serde(default)]
    pub tool_call_id: String,
    pub state: ToolState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_executed: Option<bool>,
}

impl ToolPart {
    pub fn new(tool_name: &str, tool_call_id: impl Into<String>, state: ToolState) -> Self {
        Self {
            type_name: format!("{TOOL_PREFIX}{tool_name}"),
            tool_call_id: tool_call_id.into(),
            state,
            input: None,
            output: None,
            error_text: None,
            provider_executed: None,
        }
    }

    /// Tool name without the `tool-` prefix.
    pub fn tool_name(&self) -> &str {
        self.type_name
            .strip_prefix(TOOL_PREFIX)
            .unwrap_or(&self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUrlPart {
    pub source_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocumentPart {
    pub source_id: String,
    pub media_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub url: String,
}

/// Application data part; `type_name` is the full `data-<name>` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    #[serde(skip)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl DataPart {
    pub fn name(&self) -> &str {
        self.type_name
            .strip_prefix(DATA_PREFIX)
            .unwrap_or(&self.type_name)
    }
}

/// A part the model does not recognize, preserved field for field.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownPart {
    pub type_name: String,
    pub raw: Value,
}

impl UnknownPart {
    /// Fields of the raw object; empty when the raw value was not an object.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.raw.as_object()
    }
}

/// Broad category of a part, used for logging and dispatch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Text,
    Reasoning,
    Tool,
    Source,
    File,
    Data,
    Step,
    Unknown,
}

/// One element of a message's ordered content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Part {
    Text(TextPart),
    Reasoning(ReasoningPart),
    Tool(ToolPart),
    SourceUrl(SourceUrlPart),
    SourceDocument(SourceDocumentPart),
    File(FilePart),
    Data(DataPart),
    StepStart,
    Unknown(UnknownPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart {
            text: text.into(),
            state: None,
        })
    }

    /// The wire discriminator, e.g. `text` or `tool-weather`.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Reasoning(_) => "reasoning",
            Self::Tool(tool) => &tool.type_name,
            Self::SourceUrl(_) => "source-url",
            Self::SourceDocument(_) => "source-document",
            Self::File(_) => "file",
            Self::Data(data) => &data.type_name,
            Self::StepStart => "step-start",
            Self::Unknown(unknown) => &unknown.type_name,
        }
    }

    pub fn kind(&self) -> PartKind {
        match self {
            Self::Text(_) => PartKind::Text,
            Self::Reasoning(_) => PartKind::Reasoning,
            Self::Tool(_) => PartKind::Tool,
            Self::SourceUrl(_) | Self::SourceDocument(_) => PartKind::Source,
            Self::File(_) => PartKind::File,
            Self::Data(_) => PartKind::Data,
            Self::StepStart => PartKind::Step,
            Self::Unknown(_) => PartKind::Unknown,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            Self::Tool(tool) => Some(tool),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Parses a wire value. Never fails: unrecognized or malformed input becomes
    /// [`Part::Unknown`].
    pub fn from_value(value: Value) -> Self {
        let Some(type_name) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Self::Unknown(UnknownPart {
                type_name: String::new(),
                raw: value,
            });
        };
        match parse_known(&type_name, &value) {
            Some(part) => part,
            None => Self::Unknown(UnknownPart {
                type_name,
                raw: value,
            }),
        }
    }

    /// Serializes back to the wire shape.
    pub fn to_value(&self) -> Value {
        let (type_name, body) = match self {
            Self::Text(p) => ("text", serde_json::to_value(p)),
            Self::Reasoning(p) => ("reasoning", serde_json::to_value(p)),
            Self::Tool(p) => (p.type_name.as_str(), serde_json::to_value(p)),
            Self::SourceUrl(p) => ("source-url", serde_json::to_value(p)),
            Self::SourceDocument(p) => ("source-document", serde_json::to_value(p)),
            Self::File(p) => ("file", serde_json::to_value(p)),
            Self::Data(p) => (p.type_name.as_str(), serde_json::to_value(p)),
            Self::StepStart => ("step-start", Ok(Value::Object(Map::new()))),
            Self::Unknown(p) => return p.raw.clone(),
        };
        let mut object = match body {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        object.insert("type".into(), Value::String(type_name.to_string()));
        Value::Object(object)
    }
}

fn parse_known(type_name: &str, value: &Value) -> Option<Part> {
    fn typed<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
        T::deserialize(value).ok()
    }

    let part = match type_name {
        "text" => Part::Text(typed(value)?),
        "reasoning" => Part::Reasoning(typed(value)?),
        "source-url" => Part::SourceUrl(typed(value)?),
        "source-document" => Part::SourceDocument(typed(value)?),
        "file" => Part::File(typed(value)?),
        "step-start" => Part::StepStart,
        t if t.starts_with(TOOL_PREFIX) => {
            let mut tool: ToolPart = typed(value)?;
            tool.type_name = t.to_string();
            Part::Tool(tool)
        }
        t if t.starts_with(DATA_PREFIX) => {
            let mut data: DataPart = typed(value)?;
            data.type_name = t.to_string();
            Part::Data(data)
        }
        _ => return None,
    };
    Some(part)
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Part> for Value {
    fn from(part: Part) -> Self {
        part.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_kinds() {
        let part = Part::from(json!({"type": "text", "text": "hi", "state": "streaming"}));
        assert_eq!(part.kind(), PartKind::Text);
        assert_eq!(part.as_text(), Some("hi"));

        let tool = Part::from(json!({
            "type": "tool-weather",
            "toolCallId": "c1",
            "state": "output-available",
            "input": {"location": "Paris"},
            "output": {"temperature": 20}
        }));
        let tool = tool.as_tool().expect("tool part");
        assert_eq!(tool.tool_name(), "weather");
        assert_eq!(tool.state, ToolState::OutputAvailable);

        let data = Part::from(json!({"type": "data-weather", "id": "w", "data": {"a": 1}}));
        match data {
            Part::Data(d) => assert_eq!(d.name(), "weather"),
            other => panic!("expected data part, got {other:?}"),
        }

        assert_eq!(Part::from(json!({"type": "step-start"})), Part::StepStart);
    }

    #[test]
    fn unknown_and_malformed_parts_are_preserved() {
        let raw = json!({"type": "mystery-part", "foo": 1});
        let part = Part::from(raw.clone());
        assert_eq!(part.kind(), PartKind::Unknown);
        assert_eq!(part.type_name(), "mystery-part");
        assert_eq!(part.to_value(), raw);

        let malformed = Part::from(json!({"type": "text", "text": 42}));
        assert_eq!(malformed.kind(), PartKind::Unknown);
        assert_eq!(malformed.type_name(), "text");

        let untyped = Part::from(json!([1, 2]));
        assert_eq!(untyped.type_name(), "");
    }

    #[test]
    fn unknown_tool_state_is_kept() {
        let part = Part::from(json!({"type": "tool-x", "toolCallId": "1", "state": "approval-requested"}));
        let tool = part.as_tool().expect("tool part");
        assert_eq!(tool.state, ToolState::Unknown("approval-requested".into()));
        assert_eq!(part.to_value()["state"], "approval-requested");
    }

    #[test]
    fn wire_shape_survives_serde() {
        let raw = json!({
            "type": "tool-web_search",
            "toolCallId": "abc",
            "state": "output-error",
            "errorText": "boom"
        });
        let part: Part = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(serde_json::to_value(&part).expect("serialize"), raw);
    }

    #[test]
    fn tool_state_only_moves_forward() {
        use ToolState::*;
        assert!(InputStreaming.can_advance_to(&InputStreaming));
        assert!(InputStreaming.can_advance_to(&InputAvailable));
        assert!(InputAvailable.can_advance_to(&OutputError));
        assert!(!InputAvailable.can_advance_to(&InputStreaming));
        assert!(!OutputAvailable.can_advance_to(&OutputError));
        assert!(!OutputError.can_advance_to(&OutputError));
        assert!(Unknown("x".into()).can_advance_to(&OutputAvailable));
    }
}
