//! Incremental demultiplexer for the tutor's streamed answers.
//!
//! The backend interleaves two in-band markers with the answer text:
//! `[CHAT_ID]` followed by the numeric id of the (possibly new) conversation,
//! and `[SOURCES]` followed by newline-separated sources as the final segment.
//! Markers may be split across chunks, so the scanner holds back any tail that
//! could still grow into a marker and only ever scans unconsumed input.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sources::parse_sources;

pub const CHAT_ID_MARKER: &str = "[CHAT_ID]";
pub const SOURCES_MARKER: &str = "[SOURCES]";

/// Shown in place of the answer when the stream failed before any text arrived.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error while answering. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// New answer text. `text` is everything accumulated so far.
    Partial { delta: String, text: String },
    ChatId(i64),
    Finished(ChatReply),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ReplyStatus {
    Complete,
    /// The transport failed; the reply holds whatever arrived before the failure.
    Failed(String),
    /// The caller stopped reading. Nothing was discarded.
    Cancelled,
}

/// Final outcome of one streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<String>,
    pub chat_id: Option<i64>,
    pub status: ReplyStatus,
}

impl ChatReply {
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ReplyStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    /// Inside the whitespace/digit run that follows `[CHAT_ID]`.
    ChatIdPayload,
    /// `[SOURCES]` seen; the answer is final and the rest is the source segment.
    Sources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    ChatId,
    Sources,
}

impl Marker {
    fn literal(self) -> &'static str {
        match self {
            Marker::ChatId => CHAT_ID_MARKER,
            Marker::Sources => SOURCES_MARKER,
        }
    }
}

/// Per-message parser state. Create one per streamed answer; it holds no shared state.
#[derive(Debug)]
pub struct Demultiplexer {
    phase: Phase,
    /// Unconsumed input: a held-back marker prefix while streaming, or the
    /// source segment once `[SOURCES]` has been seen.
    pending: String,
    /// Marker prefix that ended the text before `[CHAT_ID]`. It rejoins the
    /// input once the payload closes, since it may complete a marker there.
    carry: String,
    payload: String,
    text: String,
    chat_id: Option<i64>,
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self {
            phase: Phase::Streaming,
            pending: String::new(),
            carry: String::new(),
            payload: String::new(),
            text: String::new(),
            chat_id: None,
        }
    }

    /// Answer text accumulated so far, markers stripped.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    /// True once `[SOURCES]` has been seen. No further answer text will be produced.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Sources
    }

    /// Feed the next decoded chunk, in arrival order.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.pending.push_str(chunk);

        loop {
            match self.phase {
                Phase::Streaming => match find_marker(&self.pending) {
                    Some((idx, marker)) => {
                        let mut before: String = self.pending.drain(..idx).collect();
                        self.pending.drain(..marker.literal().len());
                        if marker == Marker::ChatId {
                            let keep = held_prefix_len(&before);
                            self.carry = before.split_off(before.len() - keep);
                        }
                        self.append(&before, &mut events);
                        self.phase = match marker {
                            Marker::ChatId => Phase::ChatIdPayload,
                            Marker::Sources => Phase::Sources,
                        };
                    }
                    None => {
                        let emit_to = self.pending.len() - held_prefix_len(&self.pending);
                        let ready: String = self.pending.drain(..emit_to).collect();
                        self.append(&ready, &mut events);
                        break;
                    }
                },
                Phase::ChatIdPayload => {
                    match self.pending.find(|c: char| !is_payload_char(c)) {
                        Some(end) => {
                            let run: String = self.pending.drain(..end).collect();
                            self.payload.push_str(&run);
                            self.close_payload(&mut events);
                            let carry = std::mem::take(&mut self.carry);
                            self.pending.insert_str(0, &carry);
                            self.phase = Phase::Streaming;
                        }
                        None => {
                            // The run may continue in the next chunk.
                            self.payload.push_str(&self.pending);
                            self.pending.clear();
                            break;
                        }
                    }
                }
                Phase::Sources => break,
            }
        }

        events
    }

    /// Finalize after the stream ended normally.
    pub fn finish(self) -> ChatReply {
        self.finalize(ReplyStatus::Complete)
    }

    /// Finalize after a transport failure. An empty answer becomes [`FALLBACK_REPLY`].
    pub fn fail(self, error: impl Into<String>) -> ChatReply {
        let mut reply = self.finalize(ReplyStatus::Failed(error.into()));
        if reply.text.is_empty() {
            reply.text = FALLBACK_REPLY.to_string();
        }
        reply
    }

    /// Finalize without reading further. The caller decides what to keep.
    pub fn cancel(self) -> ChatReply {
        self.finalize(ReplyStatus::Cancelled)
    }

    fn finalize(mut self, status: ReplyStatus) -> ChatReply {
        let mut sources = Vec::new();
        match self.phase {
            Phase::Streaming => {
                // A held-back tail that never became a marker is plain text.
                let tail = std::mem::take(&mut self.pending);
                self.text.push_str(&tail);
            }
            Phase::ChatIdPayload => {
                let mut events = Vec::new();
                self.close_payload(&mut events);
                let carry = std::mem::take(&mut self.carry);
                self.text.push_str(&carry);
            }
            Phase::Sources => {
                let segment = std::mem::take(&mut self.pending);
                let segment = match segment.find(SOURCES_MARKER) {
                    Some(idx) => &segment[..idx],
                    None => segment.as_str(),
                };
                let (cleaned, payload) = strip_chat_id_markers(segment);
                if let Some(payload) = payload {
                    self.payload = payload;
                    let mut events = Vec::new();
                    self.close_payload(&mut events);
                }
                sources = parse_sources(&cleaned);
            }
        }

        debug!(
            chat_id = ?self.chat_id,
            answer_len = self.text.len(),
            sources = sources.len(),
            "stream finalized"
        );

        ChatReply {
            text: self.text.trim().to_string(),
            sources,
            chat_id: self.chat_id,
            status,
        }
    }

    fn append(&mut self, delta: &str, events: &mut Vec<StreamEvent>) {
        if delta.is_empty() {
            return;
        }
        self.text.push_str(delta);
        events.push(StreamEvent::Partial {
            delta: delta.to_string(),
            text: self.text.clone(),
        });
    }

    fn close_payload(&mut self, events: &mut Vec<StreamEvent>) {
        let payload = std::mem::take(&mut self.payload);
        let Some(token) = payload.split_whitespace().next() else {
            warn!("chat id marker without a numeric payload");
            return;
        };
        match token.parse::<i64>() {
            Ok(id) if self.chat_id.is_none() => {
                debug!(chat_id = id, "chat id received");
                self.chat_id = Some(id);
                events.push(StreamEvent::ChatId(id));
            }
            Ok(id) => {
                debug!(chat_id = id, current = ?self.chat_id, "ignoring repeated chat id");
            }
            Err(e) => {
                warn!(payload = token, "malformed chat id: {}", e);
            }
        }
    }
}

/// Parse a complete response in one go. Equivalent to pushing it as a single chunk.
pub fn parse_complete(text: &str) -> ChatReply {
    let mut demux = Demultiplexer::new();
    demux.push(text);
    demux.finish()
}

fn is_payload_char(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_digit()
}

/// Earliest marker occurrence in `s`.
fn find_marker(s: &str) -> Option<(usize, Marker)> {
    let chat = s.find(CHAT_ID_MARKER).map(|i| (i, Marker::ChatId));
    let sources = s.find(SOURCES_MARKER).map(|i| (i, Marker::Sources));
    match (chat, sources) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Length of the longest suffix of `s` that is a proper prefix of a marker.
fn held_prefix_len(s: &str) -> usize {
    let longest = CHAT_ID_MARKER.len().max(SOURCES_MARKER.len()) - 1;
    (1..=longest.min(s.len()))
        .rev()
        .find(|&k| {
            [CHAT_ID_MARKER, SOURCES_MARKER]
                .iter()
                .any(|m| k < m.len() && s.ends_with(&m[..k]))
        })
        .unwrap_or(0)
}

/// Remove every `[CHAT_ID]` marker and its payload run from `s`.
/// Returns the cleaned text and the first payload found.
fn strip_chat_id_markers(s: &str) -> (String, Option<String>) {
    let mut out = String::with_capacity(s.len());
    let mut first_payload = None;
    let mut rest = s;

    while let Some(idx) = rest.find(CHAT_ID_MARKER) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + CHAT_ID_MARKER.len()..];
        let end = after.find(|c: char| !is_payload_char(c)).unwrap_or(after.len());
        if first_payload.is_none() {
            first_payload = Some(after[..end].to_string());
        }
        rest = &after[end..];
    }
    out.push_str(rest);

    (out, first_payload)
}
