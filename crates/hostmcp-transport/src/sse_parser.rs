//! Pure, no-I/O incremental Server-Sent Events decoder. Fed raw bytes off
//! the wire as they arrive; returns complete events as soon as a blank-line
//! terminator is seen.

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder holding a byte buffer across `feed` calls.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    last_event_id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Feed a chunk of bytes, returning every event completed by this feed.
    /// CRLF line endings are normalized to LF before parsing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(chunk).replace("\r\n", "\n");
        self.buffer.push_str(&text);
        let mut events = Vec::new();

        while let Some(boundary) = self.buffer.find("\n\n") {
            let raw_event: String = self.buffer.drain(..boundary).collect();
            self.buffer.drain(..2); // consume the "\n\n" terminator

            if let Some(event) = parse_event(&raw_event) {
                if let Some(id) = &event.id {
                    self.last_event_id = Some(id.clone());
                }
                events.push(event);
            }
        }

        events
    }
}

fn parse_event(raw: &str) -> Option<SseEvent> {
    let mut id = None;
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("id:") {
            id = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("event:") {
            event = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("data:") {
            data_lines.push(v.strip_prefix(' ').unwrap_or(v));
        }
    }

    if data_lines.is_empty() && id.is_none() && event.is_none() {
        return None;
    }

    Some(SseEvent {
        id,
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event_fed_whole() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: message\ndata: {\"a\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn parses_event_fed_across_multiple_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: endp").is_empty());
        assert!(parser.feed(b"oint\ndata: /m").is_empty());
        let events = parser.feed(b"sg\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("endpoint"));
        assert_eq!(events[0].data, "/msg");
    }

    #[test]
    fn tracks_last_event_id() {
        let mut parser = SseParser::new();
        parser.feed(b"id: 7\ndata: hi\n\n");
        assert_eq!(parser.last_event_id(), Some("7"));
    }

    #[test]
    fn multiline_data_is_joined_with_newlines() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn crlf_terminator_is_recognized() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hi\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn two_events_in_one_feed_are_both_returned() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\n\ndata: two\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }
}
