use anyhow::Result;
use serde_json::Value;

use super::types::{AttemptDetail, ChatRecord, HistoryItem, RecordId, Summary};
use super::BackendClient;

impl BackendClient {
    pub async fn summaries(&self) -> Result<Vec<HistoryItem>> {
        self.get_json("/history/summaries", "load summaries").await
    }

    pub async fn summary(&self, id: &RecordId) -> Result<Summary> {
        self.get_json(&format!("/history/summaries/{}", id), "load summary")
            .await
    }

    pub async fn videos(&self) -> Result<Vec<HistoryItem>> {
        self.get_json("/history/videos", "load videos").await
    }

    pub async fn chats(&self) -> Result<Vec<HistoryItem>> {
        self.get_json("/history/chats", "load chats").await
    }

    pub async fn chat(&self, id: &RecordId) -> Result<ChatRecord> {
        self.get_json(&format!("/history/chats/{}", id), "load chat")
            .await
    }

    pub async fn quizzes(&self) -> Result<Vec<HistoryItem>> {
        self.get_json("/history/quizzes", "load quizzes").await
    }

    /// Saved quiz JSON, returned as-is.
    pub async fn quiz(&self, id: &RecordId) -> Result<Value> {
        self.get_json(&format!("/history/quizzes/{}", id), "load quiz")
            .await
    }

    pub async fn attempts(&self) -> Result<Vec<HistoryItem>> {
        self.get_json("/history/attempts", "load attempts").await
    }

    pub async fn attempt(&self, id: &RecordId) -> Result<AttemptDetail> {
        self.get_json(&format!("/history/attempts/{}", id), "load attempt")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::client_for;
    use super::*;
    use crate::chat::Role;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chats_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "last_message": "What is work?", "created_at": "2024-03-02T09:00:00"},
                {"id": 2, "last_message": null}
            ])))
            .mount(&server)
            .await;

        let chats = client_for(&server).chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].display_title(), "What is work?");
        assert_eq!(chats[1].display_title(), "#2");
    }

    #[tokio::test]
    async fn test_chat_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/chats/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 4,
                "messages": [
                    {"role": "user", "text": "Define power"},
                    {"role": "assistant", "text": "Rate of doing work."}
                ]
            })))
            .mount(&server)
            .await;

        let chat = client_for(&server).chat(&RecordId::Int(4)).await.unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_summary_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/summaries/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Ohm's law",
                "key_points": ["V = IR"],
                "formulas": ["P = VI"]
            })))
            .mount(&server)
            .await;

        let summary = client_for(&server).summary(&RecordId::Int(12)).await.unwrap();
        assert_eq!(summary.summary, "Ohm's law");
        assert_eq!(summary.formulas.len(), 1);
        assert!(summary.definitions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_attempt_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/attempts/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .attempt(&RecordId::Int(99))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load attempt"));
    }
}
