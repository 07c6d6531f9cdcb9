use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, file_part, BackendClient};
use crate::chat::ChatTurn;

/// Raw answer stream; decode and demultiplex with [`crate::chat::read_stream`].
pub type AnswerStream = BoxStream<'static, Result<Bytes>>;

impl BackendClient {
    /// Ask the tutor a question. `history` includes the question itself as the last turn.
    pub async fn ask_stream(
        &self,
        question: &str,
        history: &[ChatTurn],
        chat_id: Option<i64>,
    ) -> Result<AnswerStream> {
        let history = serde_json::to_string(history).context("Failed to encode chat history")?;
        // An empty chat_id asks the backend to open a new conversation.
        let form = Form::new()
            .text("question", question.to_string())
            .text("history", history)
            .text("chat_id", chat_id.map(|id| id.to_string()).unwrap_or_default())
            .text("context_files", "[]");

        debug!(method = "POST", path = "/chatbot/ask-stream", ?chat_id, "backend request");
        let resp = self
            .stream_client
            .post(self.url("/chatbot/ask-stream"))
            .multipart(form)
            .send()
            .await
            .context("Streaming request failed")?;
        let resp = ensure_success(resp, "stream answer").await?;

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed())
    }

    /// Upload a PDF as chat context.
    pub async fn upload_pdf(&self, path: &Path) -> Result<Value> {
        let form = Form::new().part("file", file_part(path, "application/pdf").await?);
        self.post_form("/chatbot/upload", form, "upload PDF").await
    }
}
