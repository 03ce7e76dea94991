//! Streaming chat responses as a lazy chunk iterator

use super::types::{ChatMessage, Chunk, GenerationOptions};
use super::WireProtocol;
use crate::engine::EngineEndpoint;
use crate::error::{GatewayError, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::{debug, trace};

/// Longest response line held in memory. Longer lines are dropped as malformed.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reduces a raw response line to its JSON payload.
///
/// Strips whitespace and an optional SSE `data:` prefix. Returns `None` for
/// blank lines and the `[DONE]` sentinel.
pub fn normalize_line(line: &str) -> Option<&str> {
    let line = line.trim();
    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
    if payload.is_empty() || payload == "[DONE]" {
        None
    } else {
        Some(payload)
    }
}

/// Chunks of one streaming response, in arrival order.
///
/// Iteration ends after the chunk marked final, at end of stream, or after
/// the first read error, whichever comes first. Lines that do not parse or
/// exceed [`MAX_LINE_BYTES`] are skipped. Dropping the stream closes the
/// connection.
pub struct ChatStream {
    reader: Box<dyn BufRead + Send>,
    protocol: Arc<dyn WireProtocol>,
    target: String,
    finished: bool,
}

impl ChatStream {
    /// Posts the conversation and returns the open stream.
    ///
    /// A non-2xx answer is returned as `UpstreamStatus` before any chunk
    /// is produced.
    pub fn open(
        client: &Client,
        endpoint: &EngineEndpoint,
        protocol: Arc<dyn WireProtocol>,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<Self> {
        let url = endpoint.url(protocol.chat_path());
        let body = protocol.build_request(model, messages, options);

        debug!(
            url = %url,
            protocol = protocol.name(),
            model,
            messages = messages.len(),
            "Opening chat stream"
        );

        let response = client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_ENCODING, "identity")
            .json(&body)
            .send()
            .map_err(|e| GatewayError::from_transport(url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Self::from_reader(BufReader::new(response), protocol, url))
    }

    /// Stream over an already-open body
    pub fn from_reader(
        reader: impl BufRead + Send + 'static,
        protocol: Arc<dyn WireProtocol>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            protocol,
            target: target.into(),
            finished: false,
        }
    }

    /// Calls `on_chunk(text, is_final)` for every chunk in order
    pub fn for_each_chunk(self, mut on_chunk: impl FnMut(&str, bool)) -> Result<()> {
        for chunk in self {
            let chunk = chunk?;
            on_chunk(&chunk.text, chunk.is_final);
        }
        Ok(())
    }

    /// Concatenates the whole response
    pub fn collect_text(self) -> Result<String> {
        let mut text = String::new();
        self.for_each_chunk(|delta, _| text.push_str(delta))?;
        Ok(text)
    }
}

impl Iterator for ChatStream {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = Vec::new();
        loop {
            buf.clear();
            match read_capped_line(&mut *self.reader, &mut buf, MAX_LINE_BYTES) {
                Ok(LineRead::Eof) => {
                    trace!(target_url = %self.target, "Chat stream ended");
                    self.finished = true;
                    return None;
                }
                Ok(LineRead::Oversized) => {
                    debug!(limit = MAX_LINE_BYTES, "Skipping oversized stream line");
                }
                Ok(LineRead::Line) => {
                    let line = String::from_utf8_lossy(&buf);
                    let Some(payload) = normalize_line(&line) else {
                        continue;
                    };
                    match self.protocol.parse_line(payload) {
                        Some(chunk) => {
                            if chunk.is_final {
                                self.finished = true;
                            }
                            return Some(Ok(chunk));
                        }
                        None => {
                            trace!(line = payload, "Skipping malformed stream line");
                        }
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(GatewayError::Unreachable {
                        target: self.target.clone(),
                        message: format!("stream interrupted: {}", e),
                    }));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for ChatStream {}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("target", &self.target)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

enum LineRead {
    Line,
    Oversized,
    Eof,
}

/// Reads one line into `buf`, holding at most `limit + 1` bytes.
///
/// A line longer than `limit` is consumed up to its newline and reported
/// as `Oversized` with `buf` left partial.
fn read_capped_line(
    reader: &mut dyn BufRead,
    buf: &mut Vec<u8>,
    limit: usize,
) -> io::Result<LineRead> {
    let read = (&mut *reader).take(limit as u64 + 1).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.len() <= limit || buf.ends_with(b"\n") {
        return Ok(LineRead::Line);
    }

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(LineRead::Oversized);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(LineRead::Oversized);
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CompletionProtocol, OpenAiCompatibleProtocol};
    use std::io::{self, Cursor, Read};

    fn completion_stream(body: &str) -> ChatStream {
        ChatStream::from_reader(
            Cursor::new(body.as_bytes().to_vec()),
            Arc::new(CompletionProtocol),
            "test",
        )
    }

    #[test]
    fn test_normalize_line() {
        assert_eq!(normalize_line("data: {\"a\":1}\n"), Some("{\"a\":1}"));
        assert_eq!(normalize_line("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(normalize_line("  {\"a\":1}\r\n"), Some("{\"a\":1}"));
        assert_eq!(normalize_line("\n"), None);
        assert_eq!(normalize_line("data: [DONE]"), None);
    }

    #[test]
    fn test_stops_after_final_chunk() {
        let body = concat!(
            "data: {\"content\":\"a\",\"stop\":false}\n",
            "\n",
            "data: {\"content\":\"b\",\"stop\":false}\n",
            "data: {\"content\":\"c\",\"stop\":true}\n",
            "data: {\"content\":\"never\",\"stop\":false}\n",
        );
        let chunks: Vec<Chunk> = completion_stream(body).map(|c| c.unwrap()).collect();
        assert_eq!(
            chunks,
            vec![
                Chunk::new("a", false),
                Chunk::new("b", false),
                Chunk::new("c", true)
            ]
        );
    }

    #[test]
    fn test_skips_malformed_lines() {
        let body = "keepalive\n{\"content\":\"x\"\n{\"content\":\"ok\",\"stop\":true}\n";
        assert_eq!(completion_stream(body).collect_text().unwrap(), "ok");
    }

    #[test]
    fn test_eof_without_final_chunk() {
        let body = "{\"content\":\"partial\",\"stop\":false}";
        let mut calls = Vec::new();
        completion_stream(body)
            .for_each_chunk(|text, done| calls.push((text.to_string(), done)))
            .unwrap();
        assert_eq!(calls, vec![("partial".to_string(), false)]);
    }

    #[test]
    fn test_sse_done_sentinel() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
            "data: [DONE]\n\n",
        );
        let stream = ChatStream::from_reader(
            Cursor::new(body.as_bytes().to_vec()),
            Arc::new(OpenAiCompatibleProtocol),
            "test",
        );
        assert_eq!(stream.collect_text().unwrap(), "Hi");
    }

    #[test]
    fn test_oversized_line_is_dropped() {
        let huge = format!(
            "data: {{\"content\":\"{}\",\"stop\":false}}\n",
            "x".repeat(MAX_LINE_BYTES)
        );
        let body = format!("{}data: {{\"content\":\"ok\",\"stop\":true}}\n", huge);
        let chunks: Vec<Chunk> = completion_stream(&body).map(|c| c.unwrap()).collect();
        assert_eq!(chunks, vec![Chunk::new("ok", true)]);
    }

    #[test]
    fn test_capped_line_at_limit() {
        let mut reader = Cursor::new(b"abcd\nabcdef\nab".to_vec());
        let mut buf = Vec::new();

        assert!(matches!(
            read_capped_line(&mut reader, &mut buf, 4).unwrap(),
            LineRead::Line
        ));
        assert_eq!(buf, b"abcd\n");

        buf.clear();
        assert!(matches!(
            read_capped_line(&mut reader, &mut buf, 4).unwrap(),
            LineRead::Oversized
        ));
        assert!(buf.len() <= 5);

        buf.clear();
        assert!(matches!(
            read_capped_line(&mut reader, &mut buf, 4).unwrap(),
            LineRead::Line
        ));
        assert_eq!(buf, b"ab");

        buf.clear();
        assert!(matches!(
            read_capped_line(&mut reader, &mut buf, 4).unwrap(),
            LineRead::Eof
        ));
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.served = true;
            let line = b"{\"content\":\"a\",\"stop\":false}\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_read_error_ends_stream() {
        let mut stream = ChatStream::from_reader(
            BufReader::new(FailingReader { served: false }),
            Arc::new(CompletionProtocol),
            "test",
        );
        assert_eq!(stream.next().unwrap().unwrap(), Chunk::new("a", false));
        let err = stream.next().unwrap().unwrap_err();
        assert_eq!(err.category(), "unreachable");
        assert!(stream.next().is_none());
    }
}
