//! Server-sent-event framing for the streaming chat protocol.
//!
//! Upstream streams arrive as arbitrary byte chunks; frames are delimited
//! by a blank line and payloads live on `data:` lines. The parser is
//! incremental so a frame split across network reads is reassembled.

use serde::Serialize;

/// The stream-termination sentinel used by the chat protocol.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload (already joined across continuation lines).
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental SSE frame parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by this read.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer
            .push_str(&String::from_utf8_lossy(bytes).replace("\r\n", "\n"));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_frame(&frame) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_frame(frame: &str) -> Option<SseEvent> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data.is_empty() {
        return None;
    }

    let payload = data.join("\n");
    if payload.trim() == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload))
    }
}

/// Encode a payload as one SSE frame.
pub fn encode_frame<T: Serialize>(payload: &T) -> String {
    // Serialization of our own wire types cannot fail.
    let json = serde_json::to_string(payload).unwrap_or_default();
    format!("data: {json}\n\n")
}

/// The terminal frame.
pub fn done_frame() -> String {
    format!("data: {DONE_SENTINEL}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_split_across_reads() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"a\":").is_empty());
        let events = parser.feed(b"1}\n\n");
        assert_eq!(events, vec![SseEvent::Data("{\"a\":1}".to_string())]);
    }

    #[test]
    fn multiple_frames_in_one_read() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: 1\n\ndata: 2\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("1".to_string()),
                SseEvent::Data("2".to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn crlf_delimiters() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: x\r\n\r\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_string())]);
    }

    #[test]
    fn comment_frames_are_skipped() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn encode_round_trips() {
        let frame = encode_frame(&serde_json::json!({"k": "v"}));
        let mut parser = SseParser::new();
        let events = parser.feed(frame.as_bytes());
        assert_eq!(events, vec![SseEvent::Data("{\"k\":\"v\"}".to_string())]);
    }
}
