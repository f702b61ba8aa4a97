//! Incremental decoder for `text/event-stream` bodies.
//!
//! Network reads split the body at arbitrary byte offsets, including inside
//! a multi-byte character. The decoder buffers raw bytes and only decodes
//! complete lines, so callers can feed whatever the transport delivers.

/// Splits an event stream into the `data` payloads of its events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `bytes` and returns the payloads of every event completed by them.
    ///
    /// Multiple `data:` lines in one event are joined with `\n`. Comment lines
    /// and fields other than `data` are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.process_line(&line, &mut events);
        }
        events
    }

    /// Flushes a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let mut line = std::mem::take(&mut self.buffer);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.process_line(&line, &mut events);
        }
        self.dispatch(&mut events);
        events.pop()
    }

    fn process_line(&mut self, line: &[u8], events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line[0] == b':' {
            return;
        }

        let (field, value) = match line.iter().position(|byte| *byte == b':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (line, &[][..]),
        };

        if field == b"data" {
            self.data.push(String::from_utf8_lossy(value).into_owned());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: {\"a\":1}\n\n"), vec!["{\"a\":1}"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_event_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\n").is_empty());
        assert_eq!(decoder.feed(b"\ndata: next\n\n"), vec!["hello", "next"]);
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let body = "data: caf\u{e9} \u{1f600}\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for byte in body {
            events.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(events, vec!["caf\u{e9} \u{1f600}"]);
    }

    #[test]
    fn test_crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\r\nevent: message\r\ndata: one\r\ndata:two\r\n\r\n");
        assert_eq!(events, vec!["one\ntwo"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }
}
