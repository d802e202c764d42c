//! Server-sent event decoding for `streamGenerateContent?alt=sse`.
//!
//! Network chunks can split lines (and UTF-8 sequences) anywhere, so bytes
//! are buffered until a full line is available. An event is complete at the
//! blank line that follows its `data:` lines.

/// Incremental SSE decoder yielding the `data` payload of each event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, incomplete line
    line_buffer: Vec<u8>,
    /// `data:` lines of the current event
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning the payloads of every event it
    /// completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line_buffer);
                if let Some(event) = self.process_line(&line) {
                    events.push(event);
                }
            } else {
                self.line_buffer.push(byte);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if line.is_empty() {
            return self.take_event();
        }
        // Comment lines keep the connection alive
        if line.starts_with(':') {
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.data_lines.push(data.to_string());
        }
        // `event:`, `id:` and `retry:` fields are not used by this API
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: {\"text\":").is_empty());
        assert!(decoder.push(b"\"hi\"}\n").is_empty());
        let events = decoder.push(b"\n");
        assert_eq!(events, vec!["{\"text\":\"hi\"}".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        // Split in the middle of the two-byte 'é'
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["héllo".to_string()]);
    }

    #[test]
    fn test_crlf_and_multiple_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
