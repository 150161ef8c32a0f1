//! Incremental decoder for the batch progress event stream.

use super::wire::BatchProgress;

const DATA_PREFIX: &str = "data:";

/// Splits a byte stream into server-sent events and parses their payloads.
///
/// Events end at a blank line. Chunk boundaries may fall anywhere,
/// including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<BatchProgress> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(progress) = parse_block(&block[..end]) {
                events.push(progress);
            }
        }
        events
    }

    /// Parse whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<BatchProgress> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        parse_block(&rest)
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<BatchProgress> {
    let text = String::from_utf8_lossy(block);
    let payload: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
        .collect();

    if payload.is_empty() {
        return None;
    }

    let data = payload.join("\n");
    match serde_json::from_str::<BatchProgress>(&data) {
        Ok(progress) => Some(progress),
        Err(e) => {
            tracing::warn!(error = %e, payload = %data, "Skipping malformed progress event");
            None
        }
    }
}
