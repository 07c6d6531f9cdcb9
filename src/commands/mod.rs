mod chat;
mod grade;
mod history;
mod quiz;
mod search;
mod summarize;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::api::quiz::Difficulty;
use crate::api::youtube::SearchOptions;
use crate::api::BackendClient;
use crate::config::Config;

#[derive(Subcommand)]
pub enum Command {
    /// Chat with the tutor. Questions are read line by line from stdin
    Chat {
        /// Continue a saved conversation
        #[arg(long)]
        chat_id: Option<i64>,
        /// Upload a PDF as context before the first question
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Browse saved chats, summaries, videos, quizzes and attempts
    History {
        kind: HistoryKind,
        /// Show one record instead of the listing
        id: Option<String>,
    },
    /// Generate and take quizzes
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },
    /// Grade a single answer locally
    Grade {
        /// Question type: mcq, assertion-reason, numerical, short
        #[arg(long, default_value = "short")]
        kind: String,
        #[arg(long)]
        answer: String,
        #[arg(long)]
        expected: String,
    },
    /// Search YouTube for study videos
    Search {
        query: String,
        #[arg(long)]
        max_results: Option<u32>,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        include_shorts: bool,
        /// Skip the backend's relevance filter
        #[arg(long)]
        no_filter: bool,
        /// Save the n-th result (1-based) to video history
        #[arg(long)]
        save: Option<usize>,
    },
    /// Summarize a YouTube video or a local recording
    Summarize {
        /// YouTube link or bare video id
        target: Option<String>,
        #[arg(long, conflicts_with = "target")]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HistoryKind {
    Chats,
    Summaries,
    Videos,
    Quizzes,
    Attempts,
}

#[derive(Subcommand)]
pub enum QuizAction {
    /// Generate a quiz from a PDF and answer it interactively
    Take {
        pdf: PathBuf,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },
    /// Review a saved attempt
    Review { attempt_id: String },
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
    let client = || BackendClient::new(config);

    match command {
        Command::Chat { chat_id, pdf } => chat::chat(&client()?, chat_id, pdf).await,
        Command::History { kind, id } => match id {
            Some(id) => history::show(&client()?, kind, &id).await,
            None => history::list(&client()?, kind).await,
        },
        Command::Quiz { action } => match action {
            QuizAction::Take { pdf, difficulty } => {
                quiz::take(&client()?, &pdf, difficulty).await
            }
            QuizAction::Review { attempt_id } => quiz::review(&client()?, &attempt_id).await,
        },
        Command::Grade {
            kind,
            answer,
            expected,
        } => grade::grade(&kind, &answer, &expected),
        Command::Search {
            query,
            max_results,
            sort_by,
            include_shorts,
            no_filter,
            save,
        } => {
            let options = SearchOptions {
                max_results: max_results.unwrap_or(config.max_results),
                sort_by,
                include_shorts,
                use_gemini_filter: no_filter.then_some(false),
            };
            search::search(&client()?, &query, &options, save).await
        }
        Command::Summarize { target, file } => {
            summarize::summarize(&client()?, target, file).await
        }
    }
}

/// Line-oriented stdin shared by the interactive commands.
struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `label` and read one trimmed line. `None` at end of input.
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }
}
