use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::ChatTurn;
use crate::quiz::QuizQuestion;

/// Backend record id. The backend mostly uses integers, but some
/// records (saved videos) are keyed by string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(id.to_string()),
        }
    }
}

/// One row of a history listing (chats, summaries, videos, quizzes, attempts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryItem {
    const TITLE_WIDTH: usize = 40;

    /// Title for list display, falling back to the last chat message or video id.
    pub fn display_title(&self) -> String {
        let title = self
            .title
            .as_deref()
            .or(self.last_message.as_deref())
            .or(self.video_id.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.id));
        title.chars().take(Self::TITLE_WIDTH).collect()
    }

    /// Date part of `created_at` or `saved_at`.
    pub fn date(&self) -> &str {
        self.created_at
            .as_deref()
            .or(self.saved_at.as_deref())
            .map(|ts| ts.get(..10).unwrap_or(ts))
            .unwrap_or("")
    }
}

/// A stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

/// Structured study notes produced by the summarizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "notes")]
    pub key_points: Vec<Value>,
    #[serde(default)]
    pub formulas: Vec<Value>,
    #[serde(default)]
    pub definitions: Vec<Value>,
    #[serde(default)]
    pub practice_questions: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeResponse {
    pub result: Summary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

/// A video returned by search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "videoId", alias = "video_id", default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "channelTitle", alias = "channel", default)]
    pub channel_title: Option<String>,
    #[serde(rename = "publishedAt", alias = "published_at", default)]
    pub published_at: Option<String>,
    #[serde(rename = "viewCount", default)]
    pub view_count: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Video {
    pub fn thumbnail_url(&self) -> Option<&str> {
        let thumbs = self.thumbnails.as_ref();
        thumbs
            .and_then(|t| t.medium.as_ref())
            .or_else(|| thumbs.and_then(|t| t.default.as_ref()))
            .map(|t| t.url.as_str())
            .or(self.thumbnail.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// Body of `POST /youtube/save`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveVideoRequest {
    pub video_id: String,
    pub title: String,
    pub channel: Option<String>,
    pub published_at: Option<String>,
    pub thumbnail: Option<String>,
}

/// Quiz questions as stored by the backend: either `{"quiz": [...]}` or a bare array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizPayload {
    Wrapped { quiz: Vec<QuizQuestion> },
    Bare(Vec<QuizQuestion>),
}

impl Default for QuizPayload {
    fn default() -> Self {
        QuizPayload::Bare(Vec::new())
    }
}

impl QuizPayload {
    pub fn into_questions(self) -> Vec<QuizQuestion> {
        match self {
            QuizPayload::Wrapped { quiz } | QuizPayload::Bare(quiz) => quiz,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuiz {
    pub quiz_id: RecordId,
    #[serde(default)]
    pub quiz: QuizPayload,
}

/// An attempt as persisted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAttempt {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub quiz_id: RecordId,
    #[serde(default)]
    pub answers: BTreeMap<usize, String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// Response of `GET /quiz/attempt/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptDetail {
    pub attempt: StoredAttempt,
    #[serde(default)]
    pub quiz: QuizPayload,
}

/// Render a loosely-typed note entry (string, number or object) as one line.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
