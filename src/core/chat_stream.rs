//! Server-sent-event decoding for streamed completions.
//!
//! The endpoint frames every chunk as a `data:` line holding a JSON delta and
//! finishes with `data: [DONE]`. [`SseDecoder`] turns raw body bytes into
//! [`StreamEvent`]s and [`fragment_stream`] wraps a body stream into the
//! fragment sequence consumed by the conversation client.

use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::stream::{self, Stream, StreamExt};
use memchr::memchr;
use tracing::debug;

use crate::api::ChatResponse;
use crate::core::backend::FragmentStream;
use crate::core::error::ChatError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Error(String),
    End,
}

/// Incremental decoder; feed it body chunks in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes every complete line in `bytes` plus whatever was buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let event = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => process_sse_line(line.trim()),
                Err(err) => {
                    debug!("skipping invalid UTF-8 in stream: {err}");
                    None
                }
            };
            self.buffer.drain(..=newline_pos);

            if let Some(event) = event {
                let terminal = !matches!(event, StreamEvent::Fragment(_));
                events.push(event);
                if terminal {
                    self.finished = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// Flushes a trailing unterminated line once the body has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut events = self.push(b"\n");
        if !self.finished {
            self.finished = true;
            events.push(StreamEvent::End);
        }
        events
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn decode_payload(payload: &str) -> Option<StreamEvent> {
    if payload == "[DONE]" {
        return Some(StreamEvent::End);
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(StreamEvent::Fragment),
        Err(_) => {
            if payload.trim().is_empty() {
                return None;
            }
            Some(StreamEvent::Error(format_api_error(payload)))
        }
    }
}

fn process_sse_line(line: &str) -> Option<StreamEvent> {
    extract_data_payload(line).and_then(decode_payload)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            // Gemini wraps errors in a one-element array.
            value
                .pointer("/0/error/message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Renders an error body as a one-line summary when one can be found.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        return format!("API Error: {json_value}");
    }

    format!("API Error: {trimmed}")
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

/// Adapts a raw body stream into text fragments.
///
/// A decoded error ends the sequence with a single `Err` item. A body that
/// closes without `[DONE]` is treated as a normal end of generation.
pub fn fragment_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                match event {
                    StreamEvent::Fragment(text) => return Some((Ok(text), state)),
                    StreamEvent::Error(message) => {
                        state.done = true;
                        state.pending.clear();
                        return Some((Err(ChatError::Generation(message)), state));
                    }
                    StreamEvent::End => {
                        state.done = true;
                        state.pending.clear();
                        return None;
                    }
                }
            }

            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.done = true;
                    let message = format_api_error(&err.to_string());
                    return Some((Err(ChatError::Generation(message)), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    if state.pending.is_empty() {
                        return None;
                    }
                }
            }
        }
    })
    .boxed()
}
