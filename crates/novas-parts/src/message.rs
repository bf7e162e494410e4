use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::part::Part;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        })
    }
}

/// Timestamps and free-form extras attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageMetadata {
    pub fn created_now() -> Self {
        Self {
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Self::default()
        }
    }

    /// Merges a metadata object sent by the server; known keys overwrite.
    pub fn merge(&mut self, value: &Value) {
        let Some(object) = value.as_object() else {
            return;
        };
        for (key, value) in object {
            match (key.as_str(), value.as_str()) {
                ("createdAt", Some(ts)) => self.created_at = Some(ts.to_string()),
                ("completedAt", Some(ts)) => self.completed_at = Some(ts.to_string()),
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// A chat message with its ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            parts: Vec::new(),
            metadata: None,
        }
    }

    /// A user message holding a single text part.
    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            parts: vec![Part::text(text)],
            metadata: Some(MessageMetadata::created_now()),
        }
    }

    pub fn with_parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    /// Concatenation of all text parts, in order.
    pub fn text_content(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// URLs of `source-url` parts in arrival order; citation `[n]` refers to entry `n - 1`.
    pub fn source_urls(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::SourceUrl(source) => Some(source.url.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFile {
    pub name: String,
    pub file_id: String,
}

/// Chat summary as returned by the chat API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_mode: Option<String>,
    #[serde(default)]
    pub files: Vec<ChatFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_content_joins_text_parts_only() {
        let message = Message::new("m1", Role::Assistant).with_parts(vec![
            Part::text("Hello "),
            Part::StepStart,
            Part::text("world"),
        ]);
        assert_eq!(message.text_content(), "Hello world");
    }

    #[test]
    fn deserializes_message_with_mixed_parts() {
        let message: Message = serde_json::from_value(json!({
            "id": "a1",
            "role": "assistant",
            "parts": [
                {"type": "text", "text": "see [1]"},
                {"type": "source-url", "sourceId": "s1", "url": "https://example.com"},
                {"type": "brand-new", "x": true}
            ],
            "metadata": {"createdAt": "2025-01-01T00:00:00Z", "sources": []}
        }))
        .expect("message");
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.source_urls(), vec!["https://example.com"]);
        let metadata = message.metadata.expect("metadata");
        assert_eq!(metadata.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert!(metadata.extra.contains_key("sources"));
    }

    #[test]
    fn metadata_merge_keeps_extras() {
        let mut metadata = MessageMetadata::default();
        metadata.merge(&json!({"completedAt": "t1", "model": "m"}));
        assert_eq!(metadata.completed_at.as_deref(), Some("t1"));
        assert_eq!(metadata.extra.get("model"), Some(&json!("m")));
    }
}
