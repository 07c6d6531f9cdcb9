use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use super::Input;
use crate::api::types::RecordId;
use crate::api::BackendClient;
use crate::chat::sources::source_label;
use crate::chat::{ChatReply, ChatSession, ReplyStatus, Role, StreamEvent};

pub(super) async fn chat(
    client: &BackendClient,
    chat_id: Option<i64>,
    pdf: Option<PathBuf>,
) -> Result<()> {
    let mut session = match chat_id {
        Some(id) => {
            let record = client.chat(&RecordId::Int(id)).await?;
            for turn in &record.messages {
                let who = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "tutor",
                };
                println!("{}> {}", who, turn.text);
            }
            info!(chat_id = id, turns = record.messages.len(), "resumed chat");
            ChatSession::resume(id, record.messages)
        }
        None => ChatSession::new(),
    };

    if let Some(pdf) = pdf {
        client.upload_pdf(&pdf).await?;
        println!("Uploaded {} as context.", pdf.display());
    }

    println!("Ask a question. Ctrl-C stops an answer, /quit or Ctrl-D exits.");
    let mut input = Input::new();
    while let Some(question) = input.prompt("you> ").await? {
        if question == "/quit" || question == "/exit" {
            break;
        }
        if question.is_empty() {
            continue;
        }

        print!("tutor> ");
        let mut streamed = false;
        let interrupt = interrupted(tokio::signal::ctrl_c());
        let sent = session
            .send_until(
                client,
                &question,
                |event| match event {
                    StreamEvent::Partial { delta, .. } => {
                        streamed = true;
                        print!("{}", delta);
                        let _ = std::io::stdout().flush();
                    }
                    StreamEvent::ChatId(_) => {}
                    StreamEvent::Finished(reply) => print_footer(reply, streamed),
                },
                interrupt,
            )
            .await;

        if let Err(e) = sent {
            println!();
            warn!("Could not reach the tutor: {:#}", e);
        }
    }

    if let Some(id) = session.chat_id() {
        println!("Chat saved as #{}.", id);
    }
    Ok(())
}

/// Resolves when `signal` fires. If the handler could not be installed it
/// never resolves, so answers are not cut short.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_footer(reply: &ChatReply, streamed: bool) {
    match &reply.status {
        ReplyStatus::Complete => {}
        ReplyStatus::Cancelled => print!(" [stopped]"),
        ReplyStatus::Failed(_) if !streamed => print!("{}", reply.text),
        ReplyStatus::Failed(_) => print!(" [connection lost]"),
    }
    println!();

    if !reply.sources.is_empty() {
        println!("Sources:");
        for source in &reply.sources {
            let label = source_label(source);
            if label == source {
                println!("  - {}", source);
            } else {
                println!("  - {} ({})", label, source);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_signal_handler_never_interrupts() {
        let broken = async { Err(std::io::Error::other("no signal support")) };
        let waited = tokio::time::timeout(Duration::from_millis(20), interrupted(broken)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_signal_interrupts() {
        let fired = async { Ok(()) };
        let waited = tokio::time::timeout(Duration::from_millis(20), interrupted(fired)).await;
        assert!(waited.is_ok());
    }
}
