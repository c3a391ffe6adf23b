//! Incremental decoder for `text/event-stream` bodies
//!
//! Bytes arrive in arbitrary chunks; [`EventStreamDecoder::feed`] buffers
//! partial lines and yields each event once its terminating blank line has
//! been seen.

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// `event:` field, `"message"` when absent
    pub event: String,
    /// `data:` lines joined with `\n`
    pub data: String,
}

#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body, returning every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event whose blank line never arrived.
    pub fn finish(&mut self) -> Option<ServerEvent> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_split_across_chunks() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"event: endpoint\nda").is_empty());
        let events = decoder.feed(b"ta: /messages?session=1\n\ndata: {\"id\":1}\r\n\r\n");
        assert_eq!(
            events,
            vec![
                ServerEvent {
                    event: "endpoint".into(),
                    data: "/messages?session=1".into()
                },
                ServerEvent {
                    event: "message".into(),
                    data: "{\"id\":1}".into()
                },
            ]
        );
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(b": keepalive\ndata: a\ndata: b\nid: 9\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"data: {\"id\":2}").is_empty());
        assert_eq!(decoder.finish().map(|e| e.data), Some("{\"id\":2}".into()));
        assert_eq!(decoder.finish(), None);
    }
}
