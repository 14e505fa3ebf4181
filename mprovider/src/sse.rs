//! Incremental server-sent-event line framing.
//!
//! Network reads split the body at arbitrary byte offsets, including inside
//! a line or a multi-byte UTF-8 sequence. [`SseLineDecoder`] buffers raw
//! bytes and only decodes complete lines.
//!
//! ```rust
//! use mprovider::sse::{SseFrame, SseLineDecoder, classify_line};
//!
//! let mut decoder = SseLineDecoder::new();
//! decoder.push(b"data: {\"a\"");
//! assert!(decoder.next_line().is_none());
//!
//! decoder.push(b":1}\n\ndata: [DONE]\n");
//! let line = decoder.next_line().unwrap().unwrap();
//! assert_eq!(classify_line(&line), SseFrame::Data("{\"a\":1}"));
//! let blank = decoder.next_line().unwrap().unwrap();
//! assert_eq!(classify_line(&blank), SseFrame::Ignored);
//! let done = decoder.next_line().unwrap().unwrap();
//! assert_eq!(classify_line(&done), SseFrame::Done);
//! ```

use crate::ProviderError;

const DATA_FIELD: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseFrame<'a> {
    /// Payload of a `data:` line, trimmed.
    Data(&'a str),
    Done,
    /// Blank lines, comments and non-data fields.
    Ignored,
}

pub fn classify_line(line: &str) -> SseFrame<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix(DATA_FIELD) else {
        return SseFrame::Ignored;
    };

    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        SseFrame::Done
    } else if payload.is_empty() {
        SseFrame::Ignored
    } else {
        SseFrame::Data(payload)
    }
}

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pops the next complete line without its terminator.
    pub fn next_line(&mut self) -> Option<Result<String, ProviderError>> {
        let newline = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let mut line = self.buffer.drain(..=newline).collect::<Vec<_>>();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Some(
            String::from_utf8(line)
                .map_err(|err| ProviderError::protocol(format!("invalid UTF-8 in stream: {err}"))),
        )
    }

    /// Returns any unterminated trailing line once the body has ended.
    pub fn finish(&mut self) -> Option<Result<String, ProviderError>> {
        if self.buffer.is_empty() {
            return None;
        }

        self.buffer.push(b'\n');
        self.next_line()
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}
