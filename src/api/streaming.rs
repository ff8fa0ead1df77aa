use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::models::ChatResponse;
use crate::error::{BridgeError, Result};

/// Content chunks of a streamed `/api/chat` reply. Runs until the model
/// reports `done` or the caller stops polling; there is no cancellation.
pub struct ChatStream {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl Stream for ChatStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl ChatStream {
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_bytes(response.bytes_stream())
    }

    pub fn from_bytes<S>(bytes: S) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        let state = (Box::pin(bytes), NdjsonDecoder::default(), VecDeque::new(), false);
        let chunks = stream::unfold(state, |(mut bytes, mut decoder, mut ready, mut finished)| async move {
            loop {
                if let Some(item) = ready.pop_front() {
                    return Some((item, (bytes, decoder, ready, finished)));
                }
                if finished {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => ready.extend(decoder.push(&chunk).into_iter().map(into_text)),
                    Some(Err(e)) => {
                        finished = true;
                        ready.push_back(Err(BridgeError::Network(e)));
                    }
                    None => {
                        finished = true;
                        ready.extend(decoder.finish().map(into_text));
                    }
                }
            }
        });

        Self {
            inner: Box::pin(chunks),
        }
    }

    /// Drains the stream into a single string.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

fn into_text(line: Result<ChatResponse>) -> Result<String> {
    let response = line?;
    if let Some(error) = response.error {
        return Err(BridgeError::Model {
            status: 200,
            message: error,
        });
    }
    Ok(response.message.map(|m| m.content).unwrap_or_default())
}

/// Splits newline-delimited JSON into responses. Bytes are buffered until a
/// full line arrives so multibyte characters split across chunks survive.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    pending: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<ChatResponse>> {
        self.pending.extend_from_slice(chunk);

        let mut decoded = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(item) = decode_line(&line) {
                decoded.push(item);
            }
        }
        decoded
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<Result<ChatResponse>> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Option<Result<ChatResponse>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(BridgeError::from))
}
