//! Plain-text rendering of messages, transcripts and captured streams.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use novas_chat::stream::decode_sse_body;
use novas_chat::{ChunkEffect, MessageAccumulator};
use novas_parts::{Message, PartRenderer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Transcript {
    Wrapped { messages: Vec<Message> },
    Bare(Vec<Message>),
}

/// Reads a JSON transcript: an array of messages or `{"messages": [...]}`.
pub fn load_transcript(path: &Path) -> anyhow::Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let transcript: Transcript =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a message transcript", path.display()))?;
    Ok(match transcript {
        Transcript::Wrapped { messages } | Transcript::Bare(messages) => messages,
    })
}

/// Folds a captured SSE response body into the assistant message it produced.
pub fn replay_capture(path: &Path) -> anyhow::Result<Message> {
    let body = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let chunks = decode_sse_body(&body).with_context(|| format!("failed to decode {}", path.display()))?;
    let mut accumulator = MessageAccumulator::new("replay");
    for chunk in chunks {
        if let ChunkEffect::Transient(data) = accumulator.apply(chunk)? {
            tracing::debug!(data_type = %data.type_name, "transient data chunk in capture");
        }
    }
    accumulator.complete();
    Ok(accumulator.into_message())
}

pub fn render_message(renderer: &PartRenderer, message: &Message) -> String {
    let mut out = format!("## {} ({})\n", message.role, message.id);
    for slot in renderer.render_message(message) {
        if let Some(node) = slot.node {
            out.push('\n');
            out.push_str(&node.to_plain_text());
        }
    }
    out
}

pub fn render_transcript(renderer: &PartRenderer, messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| render_message(renderer, message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn transcript_renders_every_part_in_order() {
        let file = write_temp(
            r#"{"messages": [
                {"id": "u0", "role": "user", "parts": [{"type": "text", "text": "Weather in Oslo?"}]},
                {"id": "a0", "role": "assistant", "parts": [
                    {"type": "tool-get_weather", "toolCallId": "w1", "state": "output-available",
                     "output": {"city": "Oslo", "condition": "Snow", "temperature": -3}},
                    {"type": "mystery-part", "foo": 1},
                    {"type": "text", "text": "It is snowing."}
                ]}
            ]}"#,
        );
        let messages = load_transcript(file.path()).expect("transcript");
        let text = render_transcript(&novas_plugins::default_renderer(), &messages);

        assert!(text.starts_with("## user (u0)\n"));
        let weather = text.find("Snow").expect("weather card");
        let unknown = text.find("Unknown Part Type: mystery-part").expect("unknown part");
        let reply = text.find("It is snowing.").expect("text part");
        assert!(weather < unknown && unknown < reply);
    }

    #[test]
    fn bare_array_transcripts_are_accepted() {
        let file = write_temp(r#"[{"id": "u0", "role": "user", "parts": []}]"#);
        assert_eq!(load_transcript(file.path()).expect("transcript").len(), 1);

        let bad = write_temp("{\"chats\": 1}");
        assert!(load_transcript(bad.path()).is_err());
    }

    #[test]
    fn replay_folds_captured_stream() {
        let file = write_temp(concat!(
            "data: {\"type\":\"start\",\"messageId\":\"a9\"}\n\n",
            "data: {\"type\":\"tool-input-available\",\"toolCallId\":\"s1\",\"toolName\":\"web_search\",\"input\":{\"query\":\"rust\"}}\n\n",
            "data: {\"type\":\"tool-output-available\",\"toolCallId\":\"s1\",\"output\":{\"results\":[{\"title\":\"Rust\",\"url\":\"https://www.rust-lang.org/\"}]}}\n\n",
            "data: {\"type\":\"text-delta\",\"id\":\"t\",\"delta\":\"Rust is a language.\"}\n\n",
            "data: {\"type\":\"finish\"}\n\n",
            "data: [DONE]\n\n",
        ));
        let message = replay_capture(file.path()).expect("replay");
        assert_eq!(message.id, "a9");
        assert_eq!(message.parts.len(), 2);

        let text = render_message(&novas_plugins::default_renderer(), &message);
        assert!(text.contains("Rust is a language."));
        assert!(text.contains("rust-lang.org"));
    }

    #[test]
    fn replay_surfaces_server_errors() {
        let file = write_temp("data: {\"type\":\"error\",\"errorText\":\"quota exceeded\"}\n\n");
        let err = replay_capture(file.path()).expect_err("server error");
        assert!(err.to_string().contains("quota exceeded"));
    }
}
