//! Server-sent events decoding for streamed chat completions
//!
//! The endpoint answers with `data: {json}` lines and a final
//! `data: [DONE]`. Network chunks can split a line (or a UTF-8 sequence)
//! anywhere, so bytes are buffered until a newline arrives.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::core::{CompletionChunk, CompletionStream};
use crate::error::{Result, ServiceError};

use super::models::ChatCompletionChunk;

/// One decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental line decoder for `text/event-stream` bodies
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the events completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);

    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.trim() == "[DONE]" {
        Some(SseEvent::Done)
    } else if data.trim().is_empty() {
        None
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}

fn decode_chunk(data: &str) -> Result<CompletionChunk> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| ServiceError::parsing(format!("Invalid stream chunk: {}", e)))?;
    Ok(CompletionChunk {
        text: chunk.content(),
        usage: chunk.usage,
    })
}

/// Fragments forwarded from a background task reading the response body.
///
/// Dropping the stream closes the channel; the reader stops at its next
/// send and the connection is released.
struct ChunkStream {
    rx: mpsc::Receiver<Result<CompletionChunk>>,
}

impl Stream for ChunkStream {
    type Item = Result<CompletionChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Turn a successful streaming response into a [`CompletionStream`]
pub(crate) fn completion_stream(response: reqwest::Response) -> CompletionStream {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(Err(ServiceError::from(e))).await;
                    return;
                }
            };

            for event in decoder.push(&bytes) {
                match event {
                    SseEvent::Done => return,
                    SseEvent::Data(data) => {
                        let item = decode_chunk(&data);
                        let failed = item.is_err();
                        if tx.send(item).await.is_err() || failed {
                            return;
                        }
                    }
                }
            }
        }

        if let Some(SseEvent::Data(data)) = decoder.finish() {
            let _ = tx.send(decode_chunk(&data)).await;
        }
    });

    Box::pin(ChunkStream { rx })
}
