//! NDJSON stream demultiplexing
//!
//! Ollama streams one JSON object per line. The transport delivers the body
//! as arbitrary byte frames: a frame may end mid-line, mid-UTF-8 sequence,
//! or carry several lines at once. [`LineDemuxer`] re-frames bytes into
//! complete lines; [`record_stream`] turns a response body into a lazy
//! sequence of parsed records.
//!
//! Wire format: UTF-8 text, one JSON object per `\n`-separated line, no
//! envelope and no length prefixes; the stream ends when the transport
//! closes.

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Re-frames arbitrary byte chunks into newline-terminated lines.
///
/// Holds only the bytes after the last line break. The carry-over is kept as
/// bytes rather than decoded text: a frame boundary may fall inside a
/// multi-byte UTF-8 sequence, so decoding happens per complete line, never
/// per frame.
#[derive(Debug, Default)]
pub struct LineDemuxer {
    carry: Vec<u8>,
}

impl LineDemuxer {
    pub fn new() -> Self {
        Self { carry: Vec::new() }
    }

    /// Append one transport frame and return every line it completes.
    ///
    /// Lines that are empty after trimming whitespace are dropped. A
    /// trailing `\r` before the line break is stripped.
    pub fn push(&mut self, frame: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(frame);

        let mut lines = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.carry.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let text = String::from_utf8_lossy(&line);
            if !text.trim().is_empty() {
                lines.push(text.into_owned());
            }
        }
        lines
    }

    /// Consume the demuxer, returning any unterminated residue.
    ///
    /// The server is not guaranteed to terminate its last record with a
    /// line break, but a frame boundary is never a line boundary either:
    /// residue is reported so the caller can log it, not parse it.
    pub fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.carry);
        if text.trim().is_empty() {
            None
        } else {
            Some(text.into_owned())
        }
    }
}

/// Turn a streamed HTTP response body into a lazy sequence of NDJSON
/// records.
///
/// Single-use per response body, consumed in arrival order. Lines that fail
/// to parse as JSON are skipped and logged; one malformed record never
/// aborts consumption of the rest of the stream. A transport read failure is
/// yielded as the final item.
pub fn record_stream(response: reqwest::Response) -> impl Stream<Item = ClientResult<Value>> + Send {
    parse_record_stream(response.bytes_stream())
}

fn parse_record_stream<S, E>(byte_stream: S) -> impl Stream<Item = ClientResult<Value>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut demux = LineDemuxer::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(frame) = byte_stream.next().await {
            let frame = match frame {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(ClientError::Transport {
                        status: None,
                        message: format!("stream read error: {e}"),
                    });
                    return;
                }
            };

            for line in demux.push(&frame) {
                match serde_json::from_str::<Value>(&line) {
                    Ok(record) => yield Ok(record),
                    Err(e) => {
                        crate::metrics::record_malformed_line();
                        tracing::warn!(error = %e, "skipping malformed stream record");
                    }
                }
            }
        }

        if let Some(residue) = demux.finish() {
            tracing::debug!(bytes = residue.len(), "discarding unterminated stream residue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_frame_yields_all_lines() {
        let mut demux = LineDemuxer::new();
        let lines = demux.push(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert!(demux.finish().is_none());
    }

    #[test]
    fn frame_split_mid_line_carries_over() {
        let mut demux = LineDemuxer::new();
        let first = demux.push(b"{\"a\":1}\n{\"b");
        assert_eq!(first, vec![r#"{"a":1}"#]);
        let second = demux.push(b"\":2}\n");
        assert_eq!(second, vec![r#"{"b":2}"#]);
    }

    #[test]
    fn frame_split_inside_utf8_sequence() {
        // "héllo" with the two-byte é split across frames
        let bytes = "{\"r\":\"h\u{e9}llo\"}\n".as_bytes();
        let cut = bytes.iter().position(|&b| b == 0xc3).unwrap() + 1;

        let mut demux = LineDemuxer::new();
        assert!(demux.push(&bytes[..cut]).is_empty());
        let lines = demux.push(&bytes[cut..]);
        assert_eq!(lines, vec!["{\"r\":\"h\u{e9}llo\"}"]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let mut demux = LineDemuxer::new();
        let lines = demux.push(b"{\"a\":1}\r\n{\"b\":2}\r\n");
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let mut demux = LineDemuxer::new();
        let lines = demux.push(b"\n  \n{\"a\":1}\n\n");
        assert_eq!(lines, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn unterminated_residue_is_reported_not_parsed() {
        let mut demux = LineDemuxer::new();
        let lines = demux.push(b"{\"a\":1}\n{\"partial\":");
        assert_eq!(lines.len(), 1);
        assert_eq!(demux.finish().as_deref(), Some(r#"{"partial":"#));
    }

    #[test]
    fn whitespace_residue_is_ignored() {
        let mut demux = LineDemuxer::new();
        demux.push(b"{\"a\":1}\n   ");
        assert!(demux.finish().is_none());
    }

    proptest! {
        /// Chunk-boundary independence: any partition of the byte sequence
        /// into frames yields the identical line sequence and residue.
        #[test]
        fn chunk_boundaries_do_not_change_output(
            frames in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..64),
                0..16,
            )
        ) {
            let mut split = LineDemuxer::new();
            let mut split_lines = Vec::new();
            for frame in &frames {
                split_lines.extend(split.push(frame));
            }

            let whole: Vec<u8> = frames.concat();
            let mut single = LineDemuxer::new();
            let single_lines = single.push(&whole);

            prop_assert_eq!(split_lines, single_lines);
            prop_assert_eq!(split.finish(), single.finish());
        }
    }

    #[tokio::test]
    async fn record_stream_skips_malformed_lines() {
        let frames = vec![
            Ok::<_, std::convert::Infallible>(bytes::Bytes::from_static(b"{\"a\":1}\nnot-json\n")),
            Ok(bytes::Bytes::from_static(b"{\"b\":2}\n")),
        ];
        let records: Vec<_> = parse_record_stream(futures::stream::iter(frames))
            .collect()
            .await;

        let values: Vec<Value> = records.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![serde_json::json!({"a": 1}), serde_json::json!({"b": 2})]);
    }

    #[tokio::test]
    async fn record_stream_is_chunking_agnostic() {
        let one = vec![Ok::<_, std::convert::Infallible>(bytes::Bytes::from_static(
            b"{\"a\":1}\n{\"b\":2}\n",
        ))];
        let two = vec![
            Ok::<_, std::convert::Infallible>(bytes::Bytes::from_static(b"{\"a\":1}\n{\"b")),
            Ok(bytes::Bytes::from_static(b"\":2}\n")),
        ];

        let collect = |frames| async move {
            parse_record_stream(futures::stream::iter(frames))
                .map(|r| r.unwrap())
                .collect::<Vec<Value>>()
                .await
        };

        assert_eq!(collect(one).await, collect(two).await);
    }

    #[tokio::test]
    async fn read_error_surfaces_as_final_item() {
        let frames = vec![
            Ok(bytes::Bytes::from_static(b"{\"a\":1}\n")),
            Err("connection reset"),
        ];
        let records: Vec<_> = parse_record_stream(futures::stream::iter(frames))
            .collect()
            .await;

        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(
            &records[1],
            Err(ClientError::Transport { message, .. }) if message.contains("connection reset")
        ));
    }
}
