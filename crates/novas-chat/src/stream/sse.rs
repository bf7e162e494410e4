//! Incremental `text/event-stream` decoding for the UI message stream.
//!
//! The backend only sends unnamed `data:` events and ends with `data: [DONE]`,
//! so event names and ids are ignored.

/// Payload sent by the server after the last chunk.
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Joined `data:` lines of one event.
    Data(String),
    /// The `[DONE]` marker. Nothing is decoded after it.
    Done,
}

/// Splits a byte stream into events; bytes of an incomplete event are kept
/// until the next chunk completes it.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some((idx, delim_len)) = find_event_end(&self.buf) {
            let raw: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(event) = self.decode(&raw) {
                events.push(event);
                if self.done {
                    self.buf.clear();
                    break;
                }
            }
        }
        events
    }

    /// Decodes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        if self.done {
            return None;
        }
        self.decode(&rest)
    }

    fn decode(&mut self, raw: &[u8]) -> Option<SseEvent> {
        let data = event_data(raw)?;
        if data.trim() == DONE_MARKER {
            self.done = true;
            return Some(SseEvent::Done);
        }
        Some(SseEvent::Data(data))
    }
}

fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

/// `data:` lines joined with `\n`; `None` for events without data (keep-alive
/// comments, bare `event:` lines).
fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"text-del").is_empty());
        let events = decoder.feed(b"ta\",\"id\":\"t\",\"delta\":\"Hi\"}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"type\":\"text-delta\",\"id\":\"t\",\"delta\":\"Hi\"}".into()),
                SseEvent::Done,
            ]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\r\n\r\nevent: message\r\ndata: a\r\ndata: b\r\n\r\nevent: ping\n\n");
        assert_eq!(events, vec![SseEvent::Data("a\nb".into())]);
    }

    #[test]
    fn nothing_is_decoded_after_done() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: [DONE]\n\ndata: {\"type\":\"finish\"}\n\n");
        assert_eq!(events, vec![SseEvent::Done]);
        assert!(decoder.feed(b"data: {\"type\":\"finish\"}\n\n").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"finish\"}").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Data("{\"type\":\"finish\"}".into())));
        assert_eq!(decoder.finish(), None);
    }
}
