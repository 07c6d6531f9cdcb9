use anyhow::{Context, Result};

use super::quiz::print_review;
use super::summarize::print_summary;
use super::HistoryKind;
use crate::api::types::{HistoryItem, QuizPayload, RecordId};
use crate::api::BackendClient;
use crate::chat::Role;
use crate::quiz::AttemptResult;

pub(super) async fn list(client: &BackendClient, kind: HistoryKind) -> Result<()> {
    let items = match kind {
        HistoryKind::Chats => client.chats().await?,
        HistoryKind::Summaries => client.summaries().await?,
        HistoryKind::Videos => client.videos().await?,
        HistoryKind::Quizzes => client.quizzes().await?,
        HistoryKind::Attempts => client.attempts().await?,
    };

    if items.is_empty() {
        println!("Nothing saved yet.");
        return Ok(());
    }
    for item in &items {
        println!("{}", list_line(item));
    }
    Ok(())
}

fn list_line(item: &HistoryItem) -> String {
    let id = format!("#{}", item.id);
    format!("{:>6}  {:<10}  {}", id, item.date(), item.display_title())
}

pub(super) async fn show(client: &BackendClient, kind: HistoryKind, id: &str) -> Result<()> {
    let id = RecordId::from(id);
    match kind {
        HistoryKind::Chats => {
            let chat = client.chat(&id).await?;
            for turn in &chat.messages {
                let who = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "tutor",
                };
                println!("{}> {}\n", who, turn.text);
            }
        }
        HistoryKind::Summaries => print_summary(&client.summary(&id).await?),
        HistoryKind::Videos => {
            let videos = client.videos().await?;
            let video = videos
                .iter()
                .find(|v| v.id == id || v.video_id.as_deref() == Some(&id.to_string()))
                .with_context(|| format!("No saved video {}", id))?;
            println!("{}", video.display_title());
            if let Some(video_id) = &video.video_id {
                println!("https://www.youtube.com/watch?v={}", video_id);
            }
            if !video.date().is_empty() {
                println!("saved {}", video.date());
            }
        }
        HistoryKind::Quizzes => {
            let raw = client.quiz(&id).await?;
            let payload: QuizPayload = serde_json::from_value(raw.get("quiz").cloned().unwrap_or(raw))
                .context("Failed to parse saved quiz")?;
            for (idx, q) in payload.into_questions().iter().enumerate() {
                println!("{}. [{}] {}", idx + 1, q.kind, q.question);
                for option in &q.options {
                    println!("     {}", option);
                }
                println!("   answer: {}", q.answer);
            }
        }
        HistoryKind::Attempts => {
            let detail = client.attempt(&id).await?;
            let questions = detail.quiz.into_questions();
            print_review(&AttemptResult::review(&questions, &detail.attempt));
        }
    }
    Ok(())
}
