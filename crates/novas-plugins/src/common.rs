//! Shared building blocks for tool plugins.

use novas_parts::prelude::*;
use serde_json::Value;

/// Labels shown next to each tool state.
#[derive(Debug, Clone, Copy)]
pub struct StateLabels {
    pub streaming: &'static str,
    pub input_available: &'static str,
    pub output_available: &'static str,
    pub output_error: &'static str,
    pub other: &'static str,
}

impl StateLabels {
    pub fn label(&self, state: &ToolState) -> &'static str {
        match state {
            ToolState::InputStreaming => self.streaming,
            ToolState::InputAvailable => self.input_available,
            ToolState::OutputAvailable => self.output_available,
            ToolState::OutputError => self.output_error,
            ToolState::Unknown(_) => self.other,
        }
    }
}

pub fn state_badge(state: &ToolState, labels: &StateLabels) -> RenderNode {
    RenderNode::state_badge(state.clone(), labels.label(state))
}

/// Standard tool card: a header row (title + state badge) followed by `details`.
pub fn tool_card(title: impl Into<String>, tool: &ToolPart, labels: &StateLabels, details: Vec<RenderNode>) -> RenderNode {
    let mut children = Vec::with_capacity(details.len() + 1);
    children.push(RenderNode::row(vec![
        RenderNode::strong(title),
        state_badge(&tool.state, labels),
    ]));
    children.extend(details);
    RenderNode::block(BlockKind::Card, children)
}

/// Error text of a failed tool call.
pub fn tool_error(tool: &ToolPart) -> RenderNode {
    let message = tool
        .error_text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or("Tool call failed");
    RenderNode::block(BlockKind::Error, vec![RenderNode::error(message)])
}

/// The part as a tool call, or an error naming the plugin that expected one.
pub fn expect_tool<'a>(ctx: &RenderContext<'a>, plugin: &str) -> Result<&'a ToolPart, PluginError> {
    ctx.part.as_tool().ok_or_else(|| {
        PluginError::invalid_output(
            plugin,
            format!("malformed tool part `{}`", ctx.part.type_name()),
        )
    })
}

/// `tool-web_search` -> `Web Search`.
pub fn title_case_tool_name(part_type: &str) -> String {
    part_type
        .strip_prefix("tool-")
        .unwrap_or(part_type)
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Host name of a URL, or the input unchanged when it does not parse.
pub fn host_name(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_else(|| raw.to_string())
}

/// First string-valued field among `keys`.
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })
}

/// First scalar field among `keys`, formatted for display.
pub fn scalar_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Decodes an MCP text payload: `[{"type": "text", "text": "<json>"}]`.
///
/// `Ok(None)` when there is no payload to show.
pub fn mcp_payload(output: Option<&Value>) -> Result<Option<Value>, String> {
    let Some(output) = output else {
        return Ok(None);
    };
    let text = match output {
        Value::Array(items) => match items.first() {
            Some(first) => first.get("text").and_then(Value::as_str),
            None => return Ok(None),
        },
        Value::Object(_) => output.get("text").and_then(Value::as_str),
        Value::Null => return Ok(None),
        _ => None,
    };
    let Some(text) = text else {
        return Err("missing text payload".into());
    };
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| format!("payload is not JSON: {e}"))
}

/// `success: false` payloads carry an `error_message`.
pub fn payload_failure(payload: &Value, default_message: &str) -> Option<RenderNode> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = str_field(payload, &["error_message"]).unwrap_or(default_message);
        return Some(RenderNode::block(BlockKind::Error, vec![RenderNode::error(message)]));
    }
    None
}

/// Labelled value line, e.g. `Location: Paris`.
pub fn labelled(label: &str, value: impl AsRef<str>) -> RenderNode {
    RenderNode::row(vec![
        RenderNode::strong(format!("{label}:")),
        RenderNode::text(value.as_ref()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_names_are_title_cased() {
        assert_eq!(title_case_tool_name("tool-web_search"), "Web Search");
        assert_eq!(title_case_tool_name("tool-nonexistent-xyz"), "Nonexistent Xyz");
        assert_eq!(title_case_tool_name("tool-"), "");
    }

    #[test]
    fn host_name_falls_back_to_input() {
        assert_eq!(host_name("https://docs.rs/serde/latest"), "docs.rs");
        assert_eq!(host_name("not a url"), "not a url");
    }

    #[test]
    fn mcp_payload_decoding() {
        let ok = json!([{"type": "text", "text": "{\"success\": true}"}]);
        assert_eq!(mcp_payload(Some(&ok)), Ok(Some(json!({"success": true}))));
        assert!(mcp_payload(Some(&json!([{"type": "text", "text": "nope"}]))).is_err());
        assert_eq!(mcp_payload(Some(&json!([]))), Ok(None));
        assert_eq!(mcp_payload(None), Ok(None));
    }

    #[test]
    fn field_helpers_pick_first_present_key() {
        let value = json!({"city": "Oslo", "temperature": 3.5, "location": ""});
        assert_eq!(str_field(&value, &["location", "city"]), Some("Oslo"));
        assert_eq!(str_field(&value, &["location"]), None);
        assert_eq!(scalar_field(&value, &["temperature"]).as_deref(), Some("3.5"));
    }
}
