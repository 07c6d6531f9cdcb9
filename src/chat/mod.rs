pub mod demux;
pub mod reader;
pub mod sources;

use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::BackendClient;

pub use demux::{parse_complete, ChatReply, Demultiplexer, ReplyStatus, StreamEvent, FALLBACK_REPLY};
pub use reader::{read_stream, read_stream_until, ChatStreamReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// One tutor conversation: the ordered turns plus the backend's chat id once assigned.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    chat_id: Option<i64>,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue a stored conversation.
    pub fn resume(chat_id: i64, turns: Vec<ChatTurn>) -> Self {
        Self {
            chat_id: Some(chat_id),
            turns,
        }
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Append the user's question. Returns `false` for blank input.
    pub fn push_question(&mut self, question: &str) -> bool {
        if question.trim().is_empty() {
            return false;
        }
        self.turns.push(ChatTurn::user(question));
        true
    }

    /// Record the finalized answer as the assistant turn and adopt any chat id.
    pub fn complete(&mut self, reply: &ChatReply) {
        self.turns.push(ChatTurn::assistant(reply.text.clone()));
        if let Some(id) = reply.chat_id {
            if self.chat_id != Some(id) {
                debug!(chat_id = id, previous = ?self.chat_id, "chat id assigned");
            }
            self.chat_id = Some(id);
        }
    }

    /// Ask a question and stream the answer, forwarding events to `on_event`.
    ///
    /// Returns `Ok(None)` for blank input. Fails only if the request could not
    /// be opened; failures mid-stream still produce exactly one assistant turn.
    pub async fn send<F>(
        &mut self,
        client: &BackendClient,
        question: &str,
        on_event: F,
    ) -> Result<Option<ChatReply>>
    where
        F: FnMut(&StreamEvent),
    {
        self.send_until(client, question, on_event, futures::future::pending())
            .await
    }

    /// [`send`](Self::send) that stops streaming once `cancel` resolves. The
    /// text received until then becomes the assistant turn.
    pub async fn send_until<F, C>(
        &mut self,
        client: &BackendClient,
        question: &str,
        on_event: F,
        cancel: C,
    ) -> Result<Option<ChatReply>>
    where
        F: FnMut(&StreamEvent),
        C: Future<Output = ()>,
    {
        if !self.push_question(question) {
            return Ok(None);
        }

        let stream = client.ask_stream(question, &self.turns, self.chat_id).await?;
        let reply = read_stream_until(stream, on_event, cancel).await;
        self.complete(&reply);

        info!(
            chat_id = ?self.chat_id,
            answer_len = reply.text.len(),
            sources = reply.sources.len(),
            status = ?reply.status,
            "chat answer received"
        );
        Ok(Some(reply))
    }
}
