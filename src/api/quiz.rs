use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::info;

use super::types::{AttemptDetail, GeneratedQuiz, RecordId};
use super::{file_part, BackendClient};
use crate::quiz::AttemptSubmission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => anyhow::bail!("Unknown difficulty '{}'. Valid: easy, medium, hard", other),
        }
    }
}

impl BackendClient {
    /// Generate a quiz from a PDF.
    pub async fn generate_quiz(&self, path: &Path, difficulty: Difficulty) -> Result<GeneratedQuiz> {
        let form = Form::new()
            .part("file", file_part(path, "application/pdf").await?)
            .text("difficulty", difficulty.as_str());
        let generated: GeneratedQuiz = self.post_form("/quiz/generate", form, "generate quiz").await?;
        info!(quiz_id = %generated.quiz_id, %difficulty, "quiz generated");
        Ok(generated)
    }

    pub async fn save_attempt(&self, submission: &AttemptSubmission) -> Result<Value> {
        self.post_json("/quiz/attempt", submission, "save attempt")
            .await
    }

    /// A stored attempt together with the questions it answered.
    pub async fn load_attempt(&self, id: &RecordId) -> Result<AttemptDetail> {
        self.get_json(&format!("/quiz/attempt/{}", id), "load attempt")
            .await
    }
}
